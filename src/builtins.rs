use std::io::Write;

use crate::value::RuntimeValue;

/// `print(value)`, EmberScript's sole built-in callable (`spec.md` §4.5/§4.6).
/// Shared by the VM's `PRINT` opcode and the tree interpreter's `Print`/
/// `print(...)` call handling so both execution paths write stdout
/// identically. Grounded on the teacher's `core/io.rs` print/println
/// free functions.
pub fn print(value: &RuntimeValue, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_with_trailing_newline() {
        let mut buf = Vec::new();
        print(&RuntimeValue::Number(42.0), &mut buf).unwrap();
        assert_eq!(buf, b"42\n");
    }
}
