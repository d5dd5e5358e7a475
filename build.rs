fn main() {
    // Generates OUT_DIR/built.rs with git and package metadata for `built_info`.
    if let Err(err) = built::write_built_file() {
        panic!("Failed to acquire build-time information: {err}");
    }
}
