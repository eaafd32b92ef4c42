//! CLI entry point: load an image, link it, and run its start method.

use std::process::ExitCode;
use std::sync::Arc;

use corevm::config::Properties;
use corevm::loader;
use corevm::memory::Memory;
use corevm::native::NoJit;
use corevm::vm::{Interpreter, Runtime, Word};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(image_path) = args.next() else {
        eprintln!("usage: corevm <image.obe> [program args...]");
        return ExitCode::FAILURE;
    };
    let program_args: Vec<String> = args.collect();

    run(&image_path, &program_args)
}

fn run(image_path: &str, program_args: &[String]) -> ExitCode {
    let properties = Arc::new(Properties::new());
    let path = std::path::Path::new(image_path);
    properties.load_conf_near(path);

    let program = match loader::load_executable_file(path, &properties) {
        Ok(program) => program,
        Err(error) => {
            tracing::error!(%error, "failed to load image");
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let Some(start_class_id) = program.start_class_id else {
        eprintln!("image has no start class");
        return ExitCode::FAILURE;
    };
    let Some(start_method_id) = program.start_method_id else {
        eprintln!("image has no start method");
        return ExitCode::FAILURE;
    };

    let memory = Memory::new();
    let args_ref = {
        let mut heap = memory.heap.lock().unwrap();
        loader::bootstrap::build_args_array(&mut heap, program_args)
    };

    let runtime = Runtime::new(Arc::new(program), memory, properties, Arc::new(NoJit));
    let mut interpreter = Interpreter::new(runtime);

    tracing::info!(class = start_class_id, method = start_method_id, "starting interpreter");
    match interpreter.execute(start_class_id, start_method_id, vec![Word::Ref(Some(args_ref))]) {
        Ok(_) => ExitCode::SUCCESS,
        Err(unwind) => {
            eprintln!("{unwind}");
            ExitCode::FAILURE
        }
    }
}
