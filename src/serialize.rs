use std::io::{Read, Write};

use crate::bytecode::{BytecodeChunk, FunctionInfo};
use crate::error::EmberError;
use crate::value::RuntimeValue;

const TAG_NUMBER: u32 = 0;
const TAG_BOOL: u32 = 1;
const TAG_NULL: u32 = 2;
const TAG_STRING: u32 = 3;
const TAG_FUNCTION: u32 = 4;

const FUNC_TYPE_USER: i32 = 0;

/// Serializes a compiled chunk to the native-endian binary format from
/// `spec.md` §4.7: `[i32 code_count] [i32 const_count]` header, then the
/// code bytes, then the constant pool, then the `FunctionTable` as a
/// dedicated trailing section (`spec.md` §9 option (c)). Grounded on the
/// teacher's `utils/number.rs` split-field binary-IO idiom, but using
/// fixed-width `to_ne_bytes` fields instead of that module's varint
/// packing, since §4.7 mandates plain native-endian `i32`/`f64`/`u32`
/// fields rather than a variable-length encoding.
pub fn write_chunk(chunk: &BytecodeChunk, out: &mut dyn Write) -> Result<(), EmberError> {
    write_i32(out, chunk.code.len() as i32)?;
    write_i32(out, chunk.constants.len() as i32)?;
    out.write_all(&chunk.code).map_err(io_err)?;

    for constant in &chunk.constants {
        write_constant(out, constant)?;
    }

    write_i32(out, chunk.functions.len() as i32)?;
    for info in &chunk.functions {
        write_string(out, &info.name)?;
        write_i32(out, info.start_ip as i32)?;
        write_i32(out, info.arity as i32)?;
        write_i32(out, info.param_names.len() as i32)?;
        for param in &info.param_names {
            write_string(out, param)?;
        }
    }

    Ok(())
}

pub fn read_chunk(input: &mut dyn Read) -> Result<BytecodeChunk, EmberError> {
    let code_len = read_i32(input)? as usize;
    let constants_len = read_i32(input)?;

    let mut code = vec![0u8; code_len];
    input.read_exact(&mut code).map_err(io_err)?;

    let mut constants = Vec::with_capacity(constants_len.max(0) as usize);
    for _ in 0..constants_len {
        constants.push(read_constant(input)?);
    }

    let functions_len = read_i32(input)?;
    let mut functions = Vec::with_capacity(functions_len.max(0) as usize);
    for _ in 0..functions_len {
        let name = read_string(input)?;
        let start_ip = read_i32(input)? as usize;
        let arity = read_i32(input)? as usize;
        let param_count = read_i32(input)?;
        let mut param_names = Vec::with_capacity(param_count.max(0) as usize);
        for _ in 0..param_count {
            param_names.push(read_string(input)?);
        }
        functions.push(FunctionInfo { name, start_ip, arity, param_names });
    }

    Ok(BytecodeChunk { code, constants, functions })
}

fn write_constant(out: &mut dyn Write, value: &RuntimeValue) -> Result<(), EmberError> {
    match value {
        RuntimeValue::Number(n) => {
            write_u32(out, TAG_NUMBER)?;
            out.write_all(&n.to_ne_bytes()).map_err(io_err)
        }
        RuntimeValue::Boolean(b) => {
            write_u32(out, TAG_BOOL)?;
            write_u8(out, if *b { 1 } else { 0 })
        }
        RuntimeValue::Null => write_u32(out, TAG_NULL),
        RuntimeValue::String(s) => {
            write_u32(out, TAG_STRING)?;
            write_string(out, s)
        }
        // only the type tag, name, and params round-trip: the body lives in
        // the shared code stream, reachable only via the FunctionTable's
        // start_ip (spec.md §9 option (c)); has_body is always written as 0.
        RuntimeValue::Function(crate::value::Function::User(f)) => {
            write_u32(out, TAG_FUNCTION)?;
            write_i32(out, FUNC_TYPE_USER)?;
            write_string(out, &f.name)?;
            write_i32(out, f.params.len() as i32)?;
            for param in &f.params {
                write_string(out, param)?;
            }
            write_i32(out, 0)?; // has_body
            Ok(())
        }
        RuntimeValue::Array(_) | RuntimeValue::Object(_) | RuntimeValue::Function(crate::value::Function::Builtin(..)) => {
            Err(EmberError::Io(format!("{} is not a serializable constant", value.type_name())))
        }
    }
}

fn read_constant(input: &mut dyn Read) -> Result<RuntimeValue, EmberError> {
    let tag = read_u32(input)?;
    match tag {
        TAG_NUMBER => {
            let mut bytes = [0u8; 8];
            input.read_exact(&mut bytes).map_err(io_err)?;
            Ok(RuntimeValue::Number(f64::from_ne_bytes(bytes)))
        }
        TAG_BOOL => Ok(RuntimeValue::Boolean(read_u8(input)? != 0)),
        TAG_NULL => Ok(RuntimeValue::Null),
        TAG_STRING => Ok(RuntimeValue::String(read_string(input)?)),
        TAG_FUNCTION => {
            let func_type = read_i32(input)?;
            if func_type != FUNC_TYPE_USER {
                return Err(EmberError::Io(format!("unknown function constant type {}", func_type)));
            }
            let name = read_string(input)?;
            let param_count = read_i32(input)?;
            let mut params = Vec::with_capacity(param_count.max(0) as usize);
            for _ in 0..param_count {
                params.push(read_string(input)?);
            }
            let _has_body = read_i32(input)?;
            Ok(RuntimeValue::Function(crate::value::Function::User(std::rc::Rc::new(crate::value::UserFunction { name, params }))))
        }
        other => Err(EmberError::Io(format!("unknown constant tag {}", other))),
    }
}

fn write_string(out: &mut dyn Write, s: &str) -> Result<(), EmberError> {
    write_i32(out, s.len() as i32)?;
    out.write_all(s.as_bytes()).map_err(io_err)
}

fn read_string(input: &mut dyn Read) -> Result<String, EmberError> {
    let len = read_i32(input)? as usize;
    let mut bytes = vec![0u8; len];
    input.read_exact(&mut bytes).map_err(io_err)?;
    String::from_utf8(bytes).map_err(|e| EmberError::Io(e.to_string()))
}

fn write_i32(out: &mut dyn Write, v: i32) -> Result<(), EmberError> {
    out.write_all(&v.to_ne_bytes()).map_err(io_err)
}

fn read_i32(input: &mut dyn Read) -> Result<i32, EmberError> {
    let mut bytes = [0u8; 4];
    input.read_exact(&mut bytes).map_err(io_err)?;
    Ok(i32::from_ne_bytes(bytes))
}

fn write_u32(out: &mut dyn Write, v: u32) -> Result<(), EmberError> {
    out.write_all(&v.to_ne_bytes()).map_err(io_err)
}

fn read_u32(input: &mut dyn Read) -> Result<u32, EmberError> {
    let mut bytes = [0u8; 4];
    input.read_exact(&mut bytes).map_err(io_err)?;
    Ok(u32::from_ne_bytes(bytes))
}

fn write_u8(out: &mut dyn Write, v: u8) -> Result<(), EmberError> {
    out.write_all(&[v]).map_err(io_err)
}

fn read_u8(input: &mut dyn Read) -> Result<u8, EmberError> {
    let mut byte = [0u8; 1];
    input.read_exact(&mut byte).map_err(io_err)?;
    Ok(byte[0])
}

fn io_err(e: std::io::Error) -> EmberError {
    EmberError::Io(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;
    use proptest::prelude::*;

    #[test]
    fn round_trips_a_small_chunk() {
        let mut chunk = BytecodeChunk::new();
        chunk.emit_constant(RuntimeValue::Number(42.0));
        chunk.emit_op(Opcode::Print);
        chunk.register_function(FunctionInfo {
            name: "add".into(),
            start_ip: 3,
            arity: 2,
            param_names: vec!["a".into(), "b".into()],
        });

        let mut buf = Vec::new();
        write_chunk(&chunk, &mut buf).unwrap();
        let restored = read_chunk(&mut buf.as_slice()).unwrap();

        assert_eq!(restored.code, chunk.code);
        assert_eq!(restored.constants, chunk.constants);
        assert_eq!(restored.functions, chunk.functions);
    }

    #[test]
    fn function_constant_round_trips_signature_only() {
        let f = RuntimeValue::Function(crate::value::Function::User(std::rc::Rc::new(crate::value::UserFunction {
            name: "greet".into(),
            params: vec!["who".into()],
        })));
        let mut buf = Vec::new();
        write_constant(&mut buf, &f).unwrap();
        let restored = read_constant(&mut buf.as_slice()).unwrap();
        assert_eq!(restored, f);
    }

    fn scalar_value() -> impl Strategy<Value = RuntimeValue> {
        prop_oneof![
            any::<f64>().prop_filter("finite", |n| n.is_finite()).prop_map(RuntimeValue::Number),
            any::<bool>().prop_map(RuntimeValue::Boolean),
            Just(RuntimeValue::Null),
            "[a-zA-Z0-9 ]{0,32}".prop_map(RuntimeValue::String),
        ]
    }

    proptest! {
        #[test]
        fn scalar_constants_round_trip(value in scalar_value()) {
            let mut buf = Vec::new();
            write_constant(&mut buf, &value).unwrap();
            let restored = read_constant(&mut buf.as_slice()).unwrap();
            prop_assert_eq!(restored, value);
        }
    }
}
