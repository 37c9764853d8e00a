//! # Voxel World Entry Point
//!
//! This is the main entry point for the headless demo. It simply calls into the
//! library's `run()` function.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- world.json
//! ```

fn main() {
    if let Err(error) = voxel_world::run() {
        log::error!("{error}");
        std::process::exit(1);
    }
}
