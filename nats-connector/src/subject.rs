//! Subject validation and wildcard matching
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::error::{MessageBusError, Result};

/// Check that a subject is usable: non-empty, no whitespace, no empty tokens
pub fn validate_subject(subject: &str) -> Result<()> {
    if subject.is_empty() {
        return Err(MessageBusError::InvalidSubject("subject is empty".to_string()));
    }

    if subject.chars().any(char::is_whitespace) {
        return Err(MessageBusError::InvalidSubject(format!(
            "subject contains whitespace: {:?}",
            subject
        )));
    }

    if subject.split('.').any(str::is_empty) {
        return Err(MessageBusError::InvalidSubject(format!(
            "subject has an empty token: {:?}",
            subject
        )));
    }

    Ok(())
}

/// Whether `subject` is delivered to a subscription on `pattern`.
///
/// `*` matches exactly one token, `>` matches one or more trailing tokens.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(s)) if p == s => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
