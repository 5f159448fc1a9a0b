use proptest::prelude::*;

use skillsync::core::normalize_content;
use skillsync::diff::{LineKind, hunks, merge, render_unified};

fn body() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-c ]{0,6}", 0..12).prop_map(|lines| lines.join("\n"))
}

proptest! {
    // =========================================================================
    // Diff
    // =========================================================================

    #[test]
    fn test_diff_of_equal_content_is_empty(text in body()) {
        prop_assert!(hunks(&text, &text).is_empty());
    }

    #[test]
    fn test_hunk_counts_match_lines(source in body(), target in body()) {
        for hunk in hunks(&source, &target) {
            // Both spans share the same interior context lines.
            prop_assert!(hunk.source_count >= hunk.added());
            prop_assert!(hunk.target_count >= hunk.removed());
            prop_assert_eq!(
                hunk.source_count - hunk.added(),
                hunk.target_count - hunk.removed()
            );
            prop_assert!(hunk.lines.iter().any(|l| l.kind != LineKind::Context));
        }
    }

    #[test]
    fn test_render_unified_never_panics(source in ".{0,200}", target in ".{0,200}") {
        let _ = render_unified(&hunks(&source, &target));
    }

    // =========================================================================
    // Merge
    // =========================================================================

    #[test]
    fn test_merge_with_self_is_clean(text in body()) {
        let result = merge(&text, &text);
        prop_assert!(result.is_clean());
        prop_assert_eq!(result.content, normalize_content(&text));
    }

    #[test]
    fn test_merge_without_conflicts_has_no_markers(source in body(), target in body()) {
        let result = merge(&source, &target);
        if result.is_clean() {
            prop_assert!(!result.content.contains("<<<<<<< source"));
        } else {
            prop_assert!(result.content.contains("<<<<<<< source"));
            prop_assert!(result.content.contains(">>>>>>> target"));
        }
    }
}
