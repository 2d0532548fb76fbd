use std::env;
use std::fs;
use std::path::PathBuf;

// The static-array backend bakes its scratch size in at compile time. The
// value comes from this environment variable when set, and defaults to
// 32 MiB otherwise.
const SIZE_ENV_VAR: &str = "LEA_ALLOC_STATIC_ARRAY_BACKEND_BYTES";
const DEFAULT_SIZE_BYTES: u32 = 32 * 1024 * 1024;

fn main() {
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").expect("cargo always sets OUT_DIR"));
    // fs::write flushes and closes before returning, so a torn size file
    // only survives if the write itself errored out.
    fs::write(
        out_dir.join("lea_alloc_static_array_backend_size_bytes.txt"),
        scratch_len_bytes().to_string(),
    )
    .expect("could not write the static array backend size file");

    println!("cargo:rerun-if-env-changed={}", SIZE_ENV_VAR);
    // Everything that can change the baked-in scratch size or how it is
    // consumed.
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/imp_static_array.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
}

fn scratch_len_bytes() -> u32 {
    match env::var(SIZE_ENV_VAR) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            panic!(
                "{} must be a 32 bit unsigned byte count, got {:?}",
                SIZE_ENV_VAR, value
            )
        }),
        Err(env::VarError::NotPresent) => DEFAULT_SIZE_BYTES,
        Err(env::VarError::NotUnicode(raw)) => {
            panic!("{} must be unicode, got {:?}", SIZE_ENV_VAR, raw)
        }
    }
}
