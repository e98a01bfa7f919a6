// build.rs — Expose the compile-time target triple as a rustc env var.
//
// Cargo provides the `TARGET` env var to build scripts, which contains the
// canonical target triple (e.g., "aarch64-unknown-linux-gnu"). It is
// re-exported as `cargo:rustc-env=TARGET=...` so `platform::HostPlatform`
// can read it via `env!("TARGET")` when choosing the bundled binary.

fn main() {
    let target = std::env::var("TARGET")
        .expect("TARGET env var not set by Cargo. This should never happen in a normal build.");

    println!("cargo:rustc-env=TARGET={target}");
    println!("cargo:rerun-if-changed=build.rs");
}
