#![allow(non_snake_case)]
use nexsys::{solve, solve_doc};
use std::env;
use std::fs;
use std::process::ExitCode;

const DEFAULT_PATH: &str = "./demo.nxs";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let print_doc = args.iter().any(|a| a == "--doc");
    let path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or(DEFAULT_PATH);

    if print_doc {
        println!("{}\n", solve_doc());
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("cannot read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };
    match solve(&text) {
        Ok((solution, _report)) => {
            println!("{}", solution);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", path, e);
            ExitCode::FAILURE
        }
    }
}
