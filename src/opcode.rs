/// Bytecode opcode set. Grounded on the teacher's `repr(u8)` `Opcode` enum,
/// but converted via an explicit match instead of `unsafe transmute` — the
/// safer from-byte idiom shown elsewhere in the wider example corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Noop = 0,
    Eof,
    Pop,
    Dup,
    Swap,
    LoadConst,
    LoadVar,
    StoreVar,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Not,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    JumpIfFalse,
    Jump,
    Loop,
    Call,
    CallMethod,
    Return,
    Print,
    NewArray,
    ArrayPush,
    GetIndex,
    NewObject,
    GetProperty,
    SetProperty,
    SetNestedProperty,
    CopyProperties,
    GetKeys,
    GetLength,
    ToString,
}

impl Opcode {
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match byte {
            0 => Noop,
            1 => Eof,
            2 => Pop,
            3 => Dup,
            4 => Swap,
            5 => LoadConst,
            6 => LoadVar,
            7 => StoreVar,
            8 => Add,
            9 => Sub,
            10 => Mul,
            11 => Div,
            12 => Mod,
            13 => Neg,
            14 => Not,
            15 => Eq,
            16 => Neq,
            17 => Lt,
            18 => Gt,
            19 => Lte,
            20 => Gte,
            21 => And,
            22 => Or,
            23 => JumpIfFalse,
            24 => Jump,
            25 => Loop,
            26 => Call,
            27 => CallMethod,
            28 => Return,
            29 => Print,
            30 => NewArray,
            31 => ArrayPush,
            32 => GetIndex,
            33 => NewObject,
            34 => GetProperty,
            35 => SetProperty,
            36 => SetNestedProperty,
            37 => CopyProperties,
            38 => GetKeys,
            39 => GetLength,
            40 => ToString,
            _ => return None,
        })
    }

    /// Number of immediate operand bytes this opcode consumes, used by the
    /// disassembler to advance past an instruction's operands.
    pub fn operand_len(self) -> usize {
        use Opcode::*;
        match self {
            LoadConst => 1,
            LoadVar | StoreVar | JumpIfFalse | Jump | Loop => 2,
            Call => 2,
            CallMethod => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_opcode() {
        for byte in 0..=40u8 {
            let op = Opcode::from_byte(byte).expect("opcode should decode");
            assert_eq!(op.to_byte(), byte);
        }
    }

    #[test]
    fn unknown_byte_is_none() {
        assert!(Opcode::from_byte(200).is_none());
    }
}
