/// Levenshtein distance between `a` and `b`, counted in characters.
///
/// Insertions, deletions and substitutions each cost 1. Comparison is
/// case-sensitive; callers normalize first.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // Rows follow `b`, columns follow `a`.
    let mut matrix = vec![vec![0usize; a.len() + 1]; b.len() + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=a.len() {
        matrix[0][j] = j;
    }

    for i in 1..=b.len() {
        for j in 1..=a.len() {
            let cost = if b[i - 1] == a[j - 1] { 0 } else { 1 };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[b.len()][a.len()]
}

/// Normalized similarity in `[0, 1]` between what was spoken and the
/// expected word; 1.0 means identical.
///
/// Either side empty scores 0. The score is the share of the longer
/// string left untouched by the edit distance.
pub fn accuracy(spoken: &str, expected: &str) -> f64 {
    if spoken.is_empty() || expected.is_empty() {
        return 0.0;
    }

    let spoken_len = spoken.chars().count();
    let expected_len = expected.chars().count();
    let (longer, shorter, longer_len) = if spoken_len > expected_len {
        (spoken, expected, spoken_len)
    } else {
        (expected, spoken, expected_len)
    };

    // Unreachable after the empty check above, kept in this order on purpose.
    if longer_len == 0 {
        return 1.0;
    }

    (longer_len - edit_distance(longer, shorter)) as f64 / longer_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case("", "", 0)]
    #[case("abc", "", 3)]
    #[case("", "abc", 3)]
    #[case("cat", "cat", 0)]
    #[case("kat", "cat", 1)]
    #[case("kitten", "sitting", 3)]
    #[case("flaw", "lawn", 2)]
    #[case("Cat", "cat", 1)]
    fn test_edit_distance(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(edit_distance(a, b), expected);
    }

    #[test]
    fn test_edit_distance_counts_chars_not_bytes() {
        assert_eq!(edit_distance("café", "cafe"), 1);
    }

    #[rstest]
    #[case("banana")]
    #[case("a")]
    #[case("pencil sharpener")]
    fn test_identical_strings_score_one(#[case] s: &str) {
        assert_relative_eq!(accuracy(s, s), 1.0);
    }

    #[rstest]
    #[case("", "cup")]
    #[case("cup", "")]
    #[case("", "")]
    fn test_empty_input_scores_zero(#[case] spoken: &str, #[case] expected: &str) {
        assert_eq!(accuracy(spoken, expected), 0.0);
    }

    #[test]
    fn test_single_substitution() {
        assert_relative_eq!(accuracy("kat", "cat"), 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_score_relative_to_longer_string() {
        // "spoon" -> "spoons": one insertion over six characters
        assert_relative_eq!(accuracy("spoons", "spoon"), 5.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_completely_different_scores_zero() {
        assert_relative_eq!(accuracy("abc", "xyz"), 0.0);
    }

    #[rstest]
    #[case("kat", "cat")]
    #[case("fork", "forks")]
    #[case("hair comb", "hare come")]
    #[case("x", "tomato")]
    fn test_accuracy_is_symmetric(#[case] a: &str, #[case] b: &str) {
        assert_relative_eq!(accuracy(a, b), accuracy(b, a), epsilon = 1e-12);
    }

    #[rstest]
    #[case("ruler", "rular")]
    #[case("a", "plastic water bottle")]
    #[case("scissors", "sisors")]
    fn test_accuracy_stays_in_unit_range(#[case] a: &str, #[case] b: &str) {
        let score = accuracy(a, b);
        assert!((0.0..=1.0).contains(&score), "score out of range: {score}");
    }
}
