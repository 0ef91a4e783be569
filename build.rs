use std::env;
use std::process::Command;

// Toolchain facts the crate cares about
#[derive(Debug)]
struct Toolchain {
    minor: u32,
}

impl Toolchain {
    // AVX-512F intrinsics and target feature were stabilized in 1.89
    const AVX512_STABLE_MINOR: u32 = 89;

    fn probe() -> Self {
        let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
        let output = Command::new(rustc).args(["--version", "--verbose"]).output();

        let version_info = match output {
            Ok(output) => String::from_utf8_lossy(&output.stdout).to_string(),
            Err(_) => String::new(),
        };

        let minor = version_info
            .lines()
            .find_map(|line| line.strip_prefix("release: "))
            .and_then(|release| release.split('.').nth(1))
            .and_then(|minor| minor.parse().ok())
            .unwrap_or(0);

        Toolchain { minor }
    }

    fn supports_avx512(&self) -> bool {
        self.minor >= Self::AVX512_STABLE_MINOR
    }
}

fn main() {
    println!("cargo::rerun-if-changed=build.rs");

    println!("cargo::rustc-check-cfg=cfg(avx512)");

    let toolchain = Toolchain::probe();

    // Only the x86_64 backend has an AVX-512 kernel; the CPU itself is
    // checked at runtime before it is selected.
    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if target_arch == "x86_64" && toolchain.supports_avx512() {
        println!("cargo:rustc-cfg=avx512");
    }
}
