//! Fresh branch-target labels.
//!
//! One `LabelGen` is owned by a compilation run and lent to every
//! generator, so labels never repeat within one output. Generated labels
//! have the shape `prefix.N`, which no identifier-derived label can take.

#[derive(Debug, Clone, Default)]
pub struct LabelGen {
    next: u32,
}

impl LabelGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter seeded at `n`.
    pub fn starting_at(n: u32) -> Self {
        Self { next: n }
    }

    pub fn fresh(&mut self, prefix: &str) -> String {
        let label = format!("{prefix}.{}", self.next);
        self.next += 1;
        label
    }

    /// Number the next fresh label will carry.
    pub fn peek(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_labels_never_repeat() {
        let mut labels = LabelGen::new();
        let a = labels.fresh("else");
        let b = labels.fresh("else");
        let c = labels.fresh("endif");
        assert_eq!(a, "else.0");
        assert_eq!(b, "else.1");
        assert_eq!(c, "endif.2");
    }

    #[test]
    fn test_seeded_counter() {
        let mut labels = LabelGen::starting_at(40);
        assert_eq!(labels.fresh("while"), "while.40");
        assert_eq!(labels.peek(), 41);
    }
}
