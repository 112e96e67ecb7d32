use std::{env, fs, path::PathBuf, process};

use yatay::diagnostics::Diagnostics;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.as_slice() {
        [] => println!("interactive shell not yet implemented"),
        [path] => run_file(path),
        _ => {
            eprintln!("Uso: yatay [archivo]");
            process::exit(64);
        }
    }
}

fn run_file(path: &str) {
    let path = with_yatay_extension(path);
    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(_) => {
            eprintln!("No se pudo leer el archivo '{}'.", path.display());
            return;
        }
    };

    let mut diagnostics = Diagnostics::new();
    yatay::run(&source, &mut diagnostics);

    if diagnostics.had_static_error() {
        process::exit(65);
    }
    if diagnostics.had_runtime_error() {
        process::exit(70);
    }
}

/// Appends the `.yatay` extension when the given path lacks it.
fn with_yatay_extension(path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.extension().is_some_and(|ext| ext == "yatay") {
        path
    } else {
        let mut raw = path.into_os_string();
        raw.push(".yatay");
        PathBuf::from(raw)
    }
}
