use std::collections::HashMap;
use std::panic::Location;

/// Lazily loaded host source files, shared by every builder of a context.
/// A file that cannot be read is reported once and yields no comments.
#[derive(Debug, Default)]
pub(crate) struct SourceCache {
    files: HashMap<&'static str, Option<Vec<String>>>,
}

impl SourceCache {
    fn lines(&mut self, path: &'static str) -> Option<&[String]> {
        self.files
            .entry(path)
            .or_insert_with(|| match std::fs::read_to_string(path) {
                Ok(text) => Some(text.lines().map(str::to_owned).collect()),
                Err(err) => {
                    eprintln!("comment capture: cannot read {path}: {err}");
                    None
                }
            })
            .as_deref()
    }
}

/// Per-function emit-site tracker. Each emitted instruction records its
/// caller line; when the line in a file strictly advances, the `//` lines
/// left behind between the two emit sites are harvested as comments.
#[derive(Debug, Default)]
pub(crate) struct CommentTracker {
    prev: HashMap<&'static str, u32>,
}

impl CommentTracker {
    pub fn collect(
        &mut self,
        site: &'static Location<'static>,
        cache: &mut SourceCache,
    ) -> Vec<String> {
        let current = site.line();
        let Some(previous) = self.prev.insert(site.file(), current) else {
            return Vec::new();
        };
        if current <= previous {
            return Vec::new();
        }
        match cache.lines(site.file()) {
            Some(lines) => comments_between(lines, previous, current),
            None => Vec::new(),
        }
    }
}

/// Comments on the 1-based lines strictly between `previous` and `current`.
fn comments_between(lines: &[String], previous: u32, current: u32) -> Vec<String> {
    let mut found = Vec::new();
    for number in previous + 1..current {
        let Some(line) = lines.get(number as usize - 1) else {
            continue;
        };
        if let Some(at) = line.find("//") {
            found.push(line[at + 2..].trim().to_string());
        }
    }
    found
}
