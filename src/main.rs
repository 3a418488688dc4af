use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use emberscript::Source;

/// Minimal exercising binary: `ember <compile|run|exec> <path>`. The real
/// subcommand-rich CLI (package management, graphics bindings, etc.) is an
/// out-of-scope external collaborator (`spec.md` §1); this only exists to
/// drive the library end-to-end locally, grounded on the teacher's own
/// `std::env::args_os().nth(1)` argument handling.
pub fn main() {
    env_logger::init();

    let mut args = std::env::args_os().skip(1);
    let subcommand = args.next().and_then(|s| s.into_string().ok());
    let path = args.next().and_then(|s| s.into_string().ok());

    let (subcommand, path) = match (subcommand, path) {
        (Some(subcommand), Some(path)) => (subcommand, path),
        _ => {
            eprintln!("Usage: ember <compile|run|exec> <path>");
            std::process::exit(1);
        }
    };

    let result = match subcommand.as_str() {
        "compile" => compile(&path),
        "run" => run(&path),
        "exec" => exec(&path),
        other => {
            eprintln!("unknown subcommand `{}` (expected compile|run|exec)", other);
            std::process::exit(1);
        }
    };

    if let Err(error) = result {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}

fn compile(path: &str) -> Result<(), emberscript::EmberError> {
    let source = Source::path(Path::new(path)).map_err(|_| io_error(path))?;
    let chunk = emberscript::compile(source)?;

    let out_path = with_extension(path, "emberc");
    let file = File::create(&out_path).map_err(|_| io_error(&out_path))?;
    emberscript::write_chunk(&chunk, &mut BufWriter::new(file))?;
    println!("wrote {}", out_path);
    Ok(())
}

fn run(path: &str) -> Result<(), emberscript::EmberError> {
    let mut file = File::open(path).map_err(|_| io_error(path))?;
    let chunk = emberscript::read_chunk(&mut file)?;
    Ok(emberscript::vm::run(chunk, &mut io::stdout())?)
}

fn exec(path: &str) -> Result<(), emberscript::EmberError> {
    let source = Source::path(Path::new(path)).map_err(|_| io_error(path))?;
    emberscript::exec(source, &mut io::stdout())
}

fn with_extension(path: &str, ext: &str) -> String {
    match path.rfind('.') {
        Some(i) => format!("{}.{}", &path[..i], ext),
        None => format!("{}.{}", path, ext),
    }
}

fn io_error(path: &str) -> emberscript::EmberError {
    emberscript::EmberError::Io(format!("could not open file `{}`", path))
}
