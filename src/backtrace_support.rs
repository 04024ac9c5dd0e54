use std::borrow::Cow;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::constants::MAX_STACK_DEPTH;
use crate::protocol::StackFrame;

lazy_static! {
    static ref HASH_FUNC_RE: Regex = Regex::new(
        r#"(?x)
        ^(.*)::h[a-f0-9]{16}$
    "#
    )
    .unwrap();
    static ref CRATE_HASH_RE: Regex = Regex::new(
        r"(?x)
        \b(\[[a-f0-9]{16}\])
    "
    )
    .unwrap();
    static ref LIBRARY_SRC_DIR: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
}

/// Module prefix of every function defined in this library.
const LIBRARY_MODULE: &str = "yeller::";

/// Runtime and unwinder modules that sit between this library and the
/// application, e.g. the panic machinery when reporting from a panic hook.
const WELL_KNOWN_SYS_MODULES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "backtrace::",
    "__rust",
];

/// Strips the trailing legacy hash and v0 crate disambiguators from a symbol.
pub fn strip_symbol(s: &str) -> Cow<'_, str> {
    let stripped_trailing_hash = HASH_FUNC_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(s);

    CRATE_HASH_RE.replace_all(stripped_trailing_hash, "")
}

/// Checks whether the function name starts with the given pattern.
///
/// In trait implementations, the original type name is wrapped in "_< ... >" and colons are
/// replaced with dots. This function accounts for differences while checking.
pub fn function_starts_with(mut func_name: &str, mut pattern: &str) -> bool {
    if pattern.starts_with('<') {
        while let Some(rest) = pattern.strip_prefix('<') {
            pattern = rest;

            if let Some(rest) = func_name.strip_prefix('<') {
                func_name = rest;
            } else if let Some(rest) = func_name.strip_prefix("_<") {
                func_name = rest;
            } else {
                return false;
            }
        }
    } else {
        func_name = func_name.trim_start_matches('<').trim_start_matches("_<");
    }

    if !func_name.is_char_boundary(pattern.len()) {
        return false;
    }

    func_name
        .chars()
        .zip(pattern.chars())
        .all(|(f, p)| f == p || f == '.' && p == ':')
}

/// Checks if a frame belongs to this library rather than the application.
///
/// A frame is ours if its source file lives in this crate's `src` directory
/// or its function is defined in the `yeller` crate.
pub fn is_library_frame(filename: Option<&Path>, function: Option<&str>) -> bool {
    filename.is_some_and(|path| path.starts_with(&*LIBRARY_SRC_DIR))
        || function.is_some_and(|func| function_starts_with(func, LIBRARY_MODULE))
}

/// Checks if a frame belongs to the standard library or the unwinder.
///
/// Standard library sources are reported under the `/rustc/<commit>/`
/// prefix the toolchain was built at.
pub fn is_sys_frame(filename: Option<&Path>, function: Option<&str>) -> bool {
    filename.is_some_and(|path| path.starts_with("/rustc"))
        || function.is_some_and(|func| {
            WELL_KNOWN_SYS_MODULES
                .iter()
                .any(|module| function_starts_with(func, module))
        })
}

/// Captures the calling application's stack, at most [`MAX_STACK_DEPTH`] frames.
///
/// See [`capture_stack_with_depth`].
pub fn capture_stack(skip_frames: usize) -> Vec<StackFrame> {
    capture_stack_with_depth(skip_frames, MAX_STACK_DEPTH)
}

/// Captures the calling application's stack.
///
/// Frames are ordered innermost first, so the first frame is the application
/// code that called into this library.  Frames from this library are never
/// part of the result, and neither are standard library frames directly
/// below the library boundary.  `skip_frames` additional application frames
/// are dropped after that.  Call sites that cannot be symbolized
/// are kept as [`StackFrame::unresolved`] frames.
///
/// Never fails; without symbol information the result degrades to
/// unresolved frames.
pub fn capture_stack_with_depth(skip_frames: usize, max_depth: usize) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();
    if max_depth == 0 {
        return frames;
    }

    // Everything before the first library frame belongs to the unwinder.  It
    // is only used when no library frame can be identified at all.
    let mut leading: Vec<StackFrame> = Vec::new();
    let leading_limit = max_depth.saturating_add(skip_frames);
    let mut entered_library = false;
    let mut below_boundary = false;
    let mut skipped = 0;

    backtrace::trace(|raw| {
        let mut resolved = false;
        let mut accept = |frame: StackFrame, library: bool, sys: bool| {
            if library {
                entered_library = true;
                below_boundary = true;
                leading.clear();
            } else if !entered_library {
                if leading.len() < leading_limit {
                    leading.push(frame);
                }
            } else if below_boundary && sys {
                // panic machinery and closure shims between us and the caller
            } else if skipped < skip_frames {
                below_boundary = false;
                skipped += 1;
            } else if frames.len() < max_depth {
                below_boundary = false;
                frames.push(frame);
            }
        };

        backtrace::resolve_frame(raw, |symbol| {
            resolved = true;
            let function = symbol
                .name()
                .map(|name| strip_symbol(&format!("{:#}", name)).into_owned());
            let filename = symbol.filename();
            let library = is_library_frame(filename, function.as_deref());
            let sys = is_sys_frame(filename, function.as_deref());
            let frame = StackFrame::new(
                filename.map(|path| path.to_string_lossy().into_owned()),
                symbol.lineno(),
                function,
            );
            accept(frame, library, sys);
        });

        if !resolved {
            accept(StackFrame::unresolved(), false, false);
        }

        frames.len() < max_depth
    });

    if !entered_library {
        yeller_debug!("no library frame found while capturing stack, using raw trace");
        frames = leading.into_iter().skip(skip_frames).take(max_depth).collect();
    }

    frames
}
