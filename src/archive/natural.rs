//! Human-friendly ordering of page file names.
//!
//! Runs of ASCII digits compare by numeric value and everything else compares
//! case-insensitively, so `page2.jpg` sorts before `page10.jpg` and
//! `Cover.png` sorts next to `cover.png`.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Final path component, accepting both `/` and `\` separators.
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Compare two entry paths by their basenames in natural order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = basename(a).chars().peekable();
    let mut b = basename(b).chars().peekable();

    loop {
        let (ca, cb) = match (a.peek(), b.peek()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&ca), Some(&cb)) => (ca, cb),
        };

        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let run_a = take_digits(&mut a);
            let run_b = take_digits(&mut b);
            match cmp_numeric(&run_a, &run_b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }

        match ca.to_lowercase().cmp(cb.to_lowercase()) {
            Ordering::Equal => {
                a.next();
                b.next();
            }
            other => return other,
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

/// Numeric comparison of two digit runs of any length.
fn cmp_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn numbers_compare_by_value() {
        let mut names = vec!["page10.jpg", "page1.jpg", "page2.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, ["page1.jpg", "page2.jpg", "page10.jpg"]);
    }

    #[test]
    fn digits_sort_before_letters() {
        let mut names = vec!["cover.png", "10.jpg", "2.jpg", "1.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, ["1.jpg", "2.jpg", "10.jpg", "cover.png"]);
    }

    #[test]
    fn directories_are_ignored() {
        assert_eq!(natural_cmp("zzz/page1.jpg", "aaa/page2.jpg"), Ordering::Less);
        assert_eq!(natural_cmp("a\\b\\p3.png", "p3.png"), Ordering::Equal);
        assert_eq!(basename("chapter 1/001.jpg"), "001.jpg");
    }

    #[test]
    fn letters_ignore_case() {
        assert_eq!(natural_cmp("Page1.jpg", "page1.jpg"), Ordering::Equal);
        assert_eq!(natural_cmp("a.jpg", "B.jpg"), Ordering::Less);
    }

    #[test]
    fn shorter_name_sorts_first() {
        assert_eq!(natural_cmp("page", "page1"), Ordering::Less);
        assert_eq!(natural_cmp("page1", "page1a"), Ordering::Less);
    }

    #[test]
    fn leading_zeros_and_long_runs() {
        assert_eq!(natural_cmp("007.jpg", "7.jpg"), Ordering::Equal);
        assert_eq!(natural_cmp("008.jpg", "10.jpg"), Ordering::Less);
        assert_eq!(
            natural_cmp("99999999999999999999999.jpg", "100000000000000000000000.jpg"),
            Ordering::Less
        );
    }

    proptest! {
        #[test]
        fn ordering_is_antisymmetric(a in "[a-zA-Z0-9._]{0,12}", b in "[a-zA-Z0-9._]{0,12}") {
            prop_assert_eq!(natural_cmp(&a, &b), natural_cmp(&b, &a).reverse());
        }

        #[test]
        fn zero_padding_preserves_numeric_order(x in 0u32..100_000, y in 0u32..100_000) {
            let a = format!("p{x:06}.jpg");
            let b = format!("p{y}.jpg");
            prop_assert_eq!(natural_cmp(&a, &b), x.cmp(&y));
        }
    }
}
