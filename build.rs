fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    if let Err(e) = built::write_built_file() {
        panic!("Failed to acquire build-time information: {e}");
    }
}
