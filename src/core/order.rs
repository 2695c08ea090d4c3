//! Stage ordering
//!
//! Each stage instance carries an insertion-sequence `order`: max of the
//! project's existing orders plus one, starting at 1, never reassigned.
//! It is the tie-break for stage sequencing (ascending = earliest to
//! latest) and independent of chronological start dates. The read-then-
//! write around assignment is not atomic; concurrent adds racing on the
//! same project is an accepted consistency gap.

/// Next order value for a project with the given existing orders
pub fn next_order(existing: &[i64]) -> i64 {
    existing.iter().max().map_or(1, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_instance_gets_one() {
        assert_eq!(next_order(&[]), 1);
    }

    #[test]
    fn test_monotonic_increment() {
        assert_eq!(next_order(&[1]), 2);
        assert_eq!(next_order(&[1, 2, 3]), 4);
    }

    #[test]
    fn test_gaps_do_not_refill() {
        // Deleting an instance leaves a hole; new instances continue past
        // the maximum rather than reusing it.
        assert_eq!(next_order(&[1, 3, 4]), 5);
        assert_eq!(next_order(&[7]), 8);
    }

    #[test]
    fn test_unordered_input() {
        assert_eq!(next_order(&[3, 1, 2]), 4);
    }
}
