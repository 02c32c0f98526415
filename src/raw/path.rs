// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

/// Make sure paths are normalized into a consistent style:
///
/// - No leading or trailing `/`.
/// - No empty segments.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `path` is a strict descendant of `root`. Both inputs must already
/// be normalized.
pub fn in_subtree(root: &str, path: &str) -> bool {
    path.len() > root.len() + 1 && path.starts_with(root) && path.as_bytes()[root.len()] == b'/'
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_normalize_path() {
        let cases = vec![
            ("abc", "abc"),
            ("/abc", "abc"),
            ("abc/", "abc"),
            ("/a//b/c/", "a/b/c"),
        ];

        for (input, expect) in cases {
            assert_eq!(normalize_path(input), expect, "normalize {input}");
        }
    }

    #[test]
    fn test_in_subtree() {
        assert!(in_subtree("a", "a/b"));
        assert!(in_subtree("a/b", "a/b/c"));
        assert!(!in_subtree("a", "a"));
        assert!(!in_subtree("a", "ab"));
        assert!(!in_subtree("a", "ab/c"));
        assert!(!in_subtree("a/b", "a/c"));
    }
}
