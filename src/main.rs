fn main() {
    if let Err(e) = granary::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
