fn main() {
    if let Err(err) = mis_dash::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
