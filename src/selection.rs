// Menu selection helpers shared by every flow: 1-based index parsing,
// the yes/no gate and the "exit" sentinel.

/// Parse a 1-based choice for a list of `len` items and return the
/// 0-based index. Anything unparseable or outside `[1, len]` is `None`.
pub fn parse_index(input: &str, len: usize) -> Option<usize> {
    let n: usize = input.trim().parse().ok()?;
    if n >= 1 && n <= len {
        Some(n - 1)
    } else {
        None
    }
}

/// The item a 1-based choice refers to.
pub fn pick<'a, T>(items: &'a [T], input: &str) -> Option<&'a T> {
    parse_index(input, items.len()).map(|i| &items[i])
}

/// Only a case-insensitive "yes" confirms.
pub fn is_confirmed(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("yes")
}

/// Case-insensitive "exit" ends an input loop.
pub fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_maps_one_based_to_zero_based() {
        for len in 1..6 {
            for i in 1..=len {
                assert_eq!(parse_index(&i.to_string(), len), Some(i - 1));
            }
        }
    }

    #[test]
    fn out_of_range_and_garbage_are_rejected() {
        assert_eq!(parse_index("0", 3), None);
        assert_eq!(parse_index("4", 3), None);
        assert_eq!(parse_index("-1", 3), None);
        assert_eq!(parse_index("", 3), None);
        assert_eq!(parse_index("two", 3), None);
        assert_eq!(parse_index("1.5", 3), None);
        assert_eq!(parse_index("1", 0), None);
    }

    #[test]
    fn surrounding_whitespace_is_ignored_for_indices() {
        assert_eq!(parse_index(" 2 ", 2), Some(1));
    }

    #[test]
    fn pick_returns_element_at_position_minus_one() {
        let items = ["a.jsonl", "b.jsonl"];
        assert_eq!(pick(&items, "2"), Some(&"b.jsonl"));
        assert_eq!(pick(&items, "3"), None);
    }

    #[test]
    fn only_yes_confirms() {
        assert!(is_confirmed("yes"));
        assert!(is_confirmed("YES"));
        assert!(is_confirmed("Yes"));
        for answer in ["", "y", "no", "yes please", " yes", "ok"] {
            assert!(!is_confirmed(answer), "{:?} should not confirm", answer);
        }
    }

    #[test]
    fn exit_sentinel_is_case_insensitive() {
        assert!(is_exit("exit"));
        assert!(is_exit("EXIT"));
        assert!(!is_exit("exit now"));
        assert!(!is_exit(""));
    }
}
