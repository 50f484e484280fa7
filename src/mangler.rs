// Derived from code in LLVM, which is:
// Part of the LLVM Project, under the Apache License v2.0 with LLVM Exceptions.
// See https://llvm.org/LICENSE.txt for license information.
// SPDX-License-Identifier: Apache-2.0 WITH LLVM-exception

/// Recovers the plain function name from an ARM64EC mangled symbol name.
///
/// C names are mangled with a leading `#`, C++ names with an inserted `$$h`.
/// Returns `None` if `name` is not mangled.
pub fn get_arm64ec_demangled_function_name(name: &str) -> Option<String> {
    if let Some(rest) = name.strip_prefix('#') {
        return Some(rest.to_string());
    }
    if !name.starts_with('?') {
        return None;
    }

    match name.split_once("$$h") {
        Some((first, second)) if !second.is_empty() => Some(format!("{first}{second}")),
        _ => None,
    }
}
