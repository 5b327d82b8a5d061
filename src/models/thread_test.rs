use super::*;

#[test]
fn test_new_thread() {
    let thread = Thread::new("Rust questions");
    assert_eq!(thread.title(), "Rust questions");
    assert!(!thread.id().is_empty());
    assert_eq!(thread.created_at(), thread.updated_at());

    let other = Thread::new("Rust questions");
    assert_ne!(thread.id(), other.id());
}

#[test]
fn test_thread_timestamps() {
    let created_at = Utc::now() - chrono::Duration::minutes(5);
    let thread = Thread::default().with_created_at(created_at);
    assert_eq!(thread.title(), NEW_THREAD_TITLE);
    assert_eq!(thread.updated_at(), created_at);

    let now = Utc::now();
    let thread = thread.with_updated_at(now);
    assert_eq!(thread.created_at(), created_at);
    assert_eq!(thread.updated_at(), now);
}

#[test]
fn test_title_from_prompt() {
    assert_eq!(title_from_prompt("  How do lifetimes work?\n"), "How do lifetimes work?");
    assert_eq!(title_from_prompt("First line\nsecond line"), "First line");
    assert_eq!(title_from_prompt("   \n  "), NEW_THREAD_TITLE);

    let long = "a".repeat(100);
    let title = title_from_prompt(&long);
    assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
    assert!(title.ends_with('…'));

    // Multi-byte characters are counted, not bytes
    let accented = "é".repeat(MAX_TITLE_CHARS);
    assert_eq!(title_from_prompt(&accented), accented);
}
