fn main() {
    if let Err(e) = instant_replay_lib::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
