//! Build script for prores-decode
//!
//! Handles:
//! 1. NAPI-RS setup (`node` feature)
//! 2. Compiling the C accessor library via `cc` (`ffmpeg` feature)
//! 3. Linking the FFmpeg libraries (`ffmpeg` feature)
//!
//! Without features the crate is the backend-generic core and needs nothing.

#[cfg(feature = "ffmpeg")]
use std::env;
#[cfg(feature = "ffmpeg")]
use std::path::{Path, PathBuf};

fn main() {
  println!("cargo:rerun-if-changed=build.rs");

  #[cfg(feature = "node")]
  napi_build::setup();

  #[cfg(feature = "ffmpeg")]
  {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();

    let ffmpeg_dir = get_ffmpeg_dir(&target_os, &target_arch);

    compile_accessors(&ffmpeg_dir);
    link_ffmpeg(&ffmpeg_dir, &target_os);

    println!("cargo:rerun-if-changed=src/ffi/accessors.c");
    println!("cargo:rerun-if-env-changed=FFMPEG_DIR");
  }
}

/// Get FFmpeg installation directory
#[cfg(feature = "ffmpeg")]
fn get_ffmpeg_dir(target_os: &str, target_arch: &str) -> PathBuf {
  if let Ok(dir) = env::var("FFMPEG_DIR") {
    return PathBuf::from(dir);
  }

  #[cfg(unix)]
  {
    if let Ok(output) = std::process::Command::new("pkg-config")
      .args(["--variable=prefix", "libavcodec"])
      .output()
    {
      if output.status.success() {
        let prefix = String::from_utf8_lossy(&output.stdout);
        let path = PathBuf::from(prefix.trim());
        if path.exists() {
          return path;
        }
      }
    }
  }

  let common_paths = match target_os {
    "macos" => vec!["/opt/homebrew", "/usr/local", "/opt/local"],
    "linux" => vec!["/usr", "/usr/local", "/opt/ffmpeg"],
    "windows" => vec!["C:\\ffmpeg", "C:\\Program Files\\ffmpeg"],
    _ => vec![],
  };

  for path in common_paths {
    let p = PathBuf::from(path);
    if p.join("include/libavcodec/avcodec.h").exists() {
      return p;
    }
  }

  // Bundled FFmpeg in the project directory
  let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
  let platform = match (target_os, target_arch) {
    ("macos", "aarch64") => "darwin-arm64",
    ("macos", "x86_64") => "darwin-x64",
    ("linux", "x86_64") => "linux-x64",
    ("linux", "aarch64") => "linux-arm64",
    ("windows", "x86_64") => "win32-x64",
    _ => "unknown",
  };

  let bundled = manifest_dir.join("ffmpeg").join(platform);
  if bundled.exists() {
    return bundled;
  }

  println!(
    "cargo:warning=FFmpeg not found. Set FFMPEG_DIR environment variable or install FFmpeg."
  );
  PathBuf::from("/usr/local")
}

/// Compile the C accessor library
#[cfg(feature = "ffmpeg")]
fn compile_accessors(ffmpeg_dir: &Path) {
  let include_dir = ffmpeg_dir.join("include");

  let mut build = cc::Build::new();
  build
    .file("src/ffi/accessors.c")
    .include(&include_dir)
    .warnings(true)
    .extra_warnings(true);

  #[cfg(target_os = "macos")]
  {
    build.flag("-Wno-deprecated-declarations");
  }

  build.compile("ffmpeg_accessors");
}

/// Link the FFmpeg libraries ProRes decoding needs.
///
/// Static archives are preferred; when an archive is missing the library is
/// linked dynamically instead.
#[cfg(feature = "ffmpeg")]
fn link_ffmpeg(ffmpeg_dir: &Path, target_os: &str) {
  let lib_dir = ffmpeg_dir.join("lib");
  let ffmpeg_libs = ["avcodec", "swscale", "avutil"];

  let all_static = ffmpeg_libs
    .iter()
    .all(|lib| lib_dir.join(format!("lib{}.a", lib)).exists());

  if all_static {
    for lib in &ffmpeg_libs {
      let static_lib = lib_dir.join(format!("lib{}.a", lib));
      println!("cargo:rustc-link-arg={}", static_lib.display());
    }
    link_platform_libraries(target_os);
  } else {
    println!("cargo:rustc-link-search=native={}", lib_dir.display());
    for lib in &ffmpeg_libs {
      println!("cargo:rustc-link-lib=dylib={}", lib);
    }
  }
}

/// Link platform-specific system libraries needed by static FFmpeg
#[cfg(feature = "ffmpeg")]
fn link_platform_libraries(target_os: &str) {
  match target_os {
    "macos" => {
      for framework in ["CoreFoundation", "CoreVideo", "Security"] {
        println!("cargo:rustc-link-lib=framework={}", framework);
      }
      println!("cargo:rustc-link-lib=iconv");
    }
    "linux" => {
      println!("cargo:rustc-link-lib=m");
      println!("cargo:rustc-link-lib=pthread");
      println!("cargo:rustc-link-lib=dl");
    }
    "windows" => {
      for lib in ["bcrypt", "ole32", "user32"] {
        println!("cargo:rustc-link-lib={}", lib);
      }
    }
    _ => {
      println!("cargo:warning=Unknown target OS: {}", target_os);
    }
  }
}
