use std::env;
use std::path::{Path, PathBuf};

/// Voices the Flite engine knows how to register: (name, library stem).
const FLITE_VOICES: &[(&str, &str)] = &[
    ("kal", "cmu_us_kal"),
    ("awb_time", "cmu_time_awb"),
    ("kal16", "cmu_us_kal16"),
    ("awb", "cmu_us_awb"),
    ("rms", "cmu_us_rms"),
    ("slt", "cmu_us_slt"),
];

/// Languages beyond US English that voice files may need.
const FLITE_LANGS: &[&str] = &["indic", "grapheme"];

/// Library directories probed when `FLITE_LANGS` is not set.
const LIB_DIRS: &[&str] = &[
    "/usr/lib",
    "/usr/lib64",
    "/usr/lib/x86_64-linux-gnu",
    "/usr/lib/aarch64-linux-gnu",
    "/usr/local/lib",
    "/opt/homebrew/lib",
];

const INCLUDE_DIRS: &[&str] = &[
    "/usr/include/flite",
    "/usr/local/include/flite",
    "/opt/homebrew/include/flite",
];

fn main() {
    println!("cargo:rerun-if-env-changed=FLITE_VOICES");
    println!("cargo:rerun-if-env-changed=FLITE_LIB_DIR");
    println!("cargo:rerun-if-env-changed=FLITE_NO_VOICE_LOAD");
    println!("cargo:rerun-if-env-changed=FLITE_LANGS");
    println!("cargo:rerun-if-env-changed=FLITE_INCLUDE_DIR");
    println!("cargo:rerun-if-changed=build.rs");

    for (name, _) in FLITE_VOICES {
        println!("cargo:rustc-check-cfg=cfg(flite_voice_{name})");
    }
    for lang in FLITE_LANGS {
        println!("cargo:rustc-check-cfg=cfg(flite_lang_{lang})");
    }
    println!("cargo:rustc-check-cfg=cfg(flite_no_voice_load)");

    if let Ok(dir) = env::var("FLITE_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }

    if env::var_os("CARGO_FEATURE_FLITE").is_some() {
        link_flite();
    }
    if env::var_os("CARGO_FEATURE_MP3").is_some() {
        println!("cargo:rustc-link-lib=mp3lame");
    }
}

fn link_flite() {
    let requested = env::var("FLITE_VOICES").unwrap_or_else(|_| {
        FLITE_VOICES
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(",")
    });

    for name in requested.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match FLITE_VOICES.iter().find(|(known, _)| *known == name) {
            Some((_, stem)) => {
                println!("cargo:rustc-link-lib=flite_{stem}");
                println!("cargo:rustc-cfg=flite_voice_{name}");
            }
            None => println!("cargo:warning={name} is not a builtin Flite voice"),
        }
    }

    if env::var_os("FLITE_NO_VOICE_LOAD").is_some() {
        println!("cargo:rustc-cfg=flite_no_voice_load");
    }

    let langs: Vec<String> = match env::var("FLITE_LANGS") {
        Ok(list) => list
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != "eng")
            .map(str::to_string)
            .collect(),
        Err(_) => FLITE_LANGS
            .iter()
            .filter(|lang| have_library(&format!("flite_cmu_{lang}_lang")))
            .map(|lang| lang.to_string())
            .collect(),
    };
    for lang in &langs {
        if !FLITE_LANGS.contains(&lang.as_str()) {
            println!("cargo:warning={lang} is not a Flite language this crate registers");
            continue;
        }
        println!("cargo:rustc-link-lib=flite_cmu_{lang}_lang");
        println!("cargo:rustc-link-lib=flite_cmu_{lang}_lex");
        println!("cargo:rustc-cfg=flite_lang_{lang}");
    }

    if let Some(version) = flite_version() {
        println!("cargo:rustc-env=FLITE_PROJECT_VERSION={version}");
    }

    for lib in ["flite_usenglish", "flite_cmulex", "flite", "m"] {
        println!("cargo:rustc-link-lib={lib}");
    }
}

fn search_dirs(var: &str, defaults: &[&str]) -> Vec<PathBuf> {
    env::var_os(var)
        .map(PathBuf::from)
        .into_iter()
        .chain(defaults.iter().map(PathBuf::from))
        .collect()
}

fn have_library(name: &str) -> bool {
    search_dirs("FLITE_LIB_DIR", LIB_DIRS).iter().any(|dir| {
        ["so", "a", "dylib"]
            .iter()
            .any(|ext| dir.join(format!("lib{name}.{ext}")).exists())
    })
}

/// `FLITE_PROJECT_VERSION` from the first `flite_version.h` found.
fn flite_version() -> Option<String> {
    search_dirs("FLITE_INCLUDE_DIR", INCLUDE_DIRS)
        .iter()
        .find_map(|dir| read_version(&dir.join("flite_version.h")))
}

fn read_version(header: &Path) -> Option<String> {
    let text = std::fs::read_to_string(header).ok()?;
    text.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("#define FLITE_PROJECT_VERSION")?;
        Some(rest.trim().trim_matches('"').to_string())
    })
}
