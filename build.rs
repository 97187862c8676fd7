fn main() {
    // Rerun when the token grammar changes
    println!("cargo:rerun-if-changed=src/lexer.pest");
}
