fn main() {
    if let Err(e) = sidechat::cli::main() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
