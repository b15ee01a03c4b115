fn main() {
    if let Err(err) = outlookctl::cli::main() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
