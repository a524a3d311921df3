//! Cursor over the enabled highlights, ordered by global offset.

/// A logical pointer into the sequence of visible highlights. The
/// registry recomputes `total` whenever the set of visible highlights
/// changes; movement wraps around at both ends.
#[derive(Debug, Default)]
pub struct Cursor {
    index: Option<usize>,
    total: usize,
    iterable: Option<Vec<String>>,
}

impl Cursor {
    /// Reset the position and adopt a new total.
    pub fn clear(&mut self, total: usize) {
        self.index = None;
        self.total = total;
    }

    /// Restrict iteration to the named query sets, or lift the
    /// restriction with `None`. Resets the position.
    pub fn set_iterable(&mut self, names: Option<Vec<String>>) {
        self.iterable = names;
        self.index = None;
    }

    /// The active whitelist, if any.
    pub fn iterable(&self) -> Option<&[String]> {
        self.iterable.as_deref()
    }

    /// Whether a query set participates in iteration.
    pub fn allows(&self, name: &str) -> bool {
        match &self.iterable {
            None => true,
            Some(names) => names.iter().any(|n| n == name),
        }
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Position the cursor, wrapping out-of-range values: forward to the
    /// first highlight on overflow, or backward to the last one when
    /// `reverse` is set.
    pub fn set(&mut self, index: isize, reverse: bool) {
        if self.total == 0 {
            self.index = None;
            return;
        }
        let total = self.total as isize;
        let wrapped = if index < 0 {
            if reverse { total - 1 } else { 0 }
        } else if index >= total {
            if reverse { total - 1 } else { 0 }
        } else {
            index
        };
        self.index = Some(wrapped as usize);
    }

    /// Advance to the next highlight, rolling over to the first.
    pub fn next(&mut self) {
        match self.index {
            None => self.set(0, false),
            Some(i) => self.set(i as isize + 1, false),
        }
    }

    /// Step back to the previous highlight, rolling over to the last.
    pub fn prev(&mut self) {
        match self.index {
            None => self.set(-1, true),
            Some(i) => self.set(i as isize - 1, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cursor_stays_unset() {
        let mut cursor = Cursor::default();
        cursor.clear(0);
        cursor.next();
        assert_eq!(cursor.index(), None);
        cursor.prev();
        assert_eq!(cursor.index(), None);
    }

    #[test]
    fn next_rolls_over_forward() {
        let mut cursor = Cursor::default();
        cursor.clear(3);
        cursor.next();
        assert_eq!(cursor.index(), Some(0));
        cursor.next();
        cursor.next();
        assert_eq!(cursor.index(), Some(2));
        cursor.next();
        assert_eq!(cursor.index(), Some(0));
    }

    #[test]
    fn prev_rolls_over_backward() {
        let mut cursor = Cursor::default();
        cursor.clear(3);
        cursor.prev();
        assert_eq!(cursor.index(), Some(2));
        cursor.prev();
        assert_eq!(cursor.index(), Some(1));
    }

    #[test]
    fn whitelist_filters_names() {
        let mut cursor = Cursor::default();
        assert!(cursor.allows("anything"));
        cursor.set_iterable(Some(vec!["one".into()]));
        assert!(cursor.allows("one"));
        assert!(!cursor.allows("two"));
        cursor.set_iterable(None);
        assert!(cursor.allows("two"));
    }
}
