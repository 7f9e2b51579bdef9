mod common;

use common::Harness;
use core_mode::Mode;
use pretty_assertions::assert_eq;

fn run(text: &str, keys: &str) -> Harness {
    let mut h = Harness::new(text);
    h.keys(keys);
    h
}

#[test]
fn delete_word_and_counted_words() {
    assert_eq!(run("foo bar", "dw").text(), "bar");
    assert_eq!(run("a b c", "d2w").text(), "c");
    assert_eq!(run("a b c", "2dw").text(), "c");
}

#[test]
fn delete_lines_with_count() {
    let h = run("1\n2\n3\n4", "3dd");
    assert_eq!(h.text(), "4");
    assert_eq!(h.register('"').as_deref(), Some("1\n2\n3\n"));
}

#[test]
fn yank_line_and_put() {
    let h = run("a\nb", "yyp");
    assert_eq!(h.text(), "a\na\nb");
    assert_eq!(h.cursor(), (1, 0));
}

#[test]
fn named_register_round_trip() {
    let h = run("a\nb", "\"ayyj\"ap");
    assert_eq!(h.text(), "a\nb\na");
    assert_eq!(h.register('a').as_deref(), Some("a\n"));
}

#[test]
fn delete_chars() {
    let h = run("abcd", "2x");
    assert_eq!(h.text(), "cd");
    assert_eq!(h.register('"').as_deref(), Some("ab"));

    let mut h = Harness::new("abcd");
    h.set_cursor(0, 3);
    h.keys("X");
    assert_eq!(h.text(), "abd");
}

#[test]
fn delete_and_change_to_line_end() {
    let mut h = Harness::new("abcd");
    h.set_cursor(0, 1);
    h.keys("D");
    assert_eq!(h.text(), "a");
    assert_eq!(h.cursor(), (0, 0));

    let mut h = Harness::new("abcd");
    h.set_cursor(0, 1);
    h.keys("CZ\u{1b}");
    assert_eq!(h.text(), "aZ");
    assert_eq!(h.vi.mode(), Mode::Normal);
}

#[test]
fn join_toggle_case_and_replace() {
    assert_eq!(run("a\n  b", "J").text(), "a b");

    let h = run("abc", "2~");
    assert_eq!(h.text(), "ABc");
    assert_eq!(h.cursor(), (0, 2));

    let h = run("abc", "2rx");
    assert_eq!(h.text(), "xxc");
    assert_eq!(h.cursor(), (0, 1));
}

#[test]
fn shift_lines() {
    assert_eq!(run("a", ">>").text(), "    a");
    assert_eq!(run("      a", "<<").text(), "  a");
}

#[test]
fn open_lines_and_append() {
    assert_eq!(run("a", "ob\u{1b}").text(), "a\nb");
    assert_eq!(run("a", "Ob\u{1b}").text(), "b\na");
    assert_eq!(run("ab", "Ac\u{1b}").text(), "abc");
    assert_eq!(run("  ab", "Ix\u{1b}").text(), "  xab");
}

#[test]
fn insert_backspace_and_enter() {
    let h = run("", "iabc\u{8}\rd\u{1b}");
    assert_eq!(h.text(), "ab\nd");
}

#[test]
fn overwrite_mode_replaces_characters() {
    assert_eq!(run("abcd", "Rxy\u{1b}").text(), "xycd");
}

#[test]
fn visual_char_delete() {
    let h = run("abcdef", "vlld");
    assert_eq!(h.text(), "def");
    assert_eq!(h.vi.mode(), Mode::Normal);
    assert!(h.surface.borrow().selection().is_none());
}

#[test]
fn visual_line_delete_and_yank() {
    assert_eq!(run("1\n2\n3", "Vjd").text(), "3");
    let h = run("1\n2", "Vy");
    assert_eq!(h.register('"').as_deref(), Some("1\n"));
    assert_eq!(h.text(), "1\n2");
}

#[test]
fn visual_case_operators() {
    assert_eq!(run("abc", "vlU").text(), "ABc");
    assert_eq!(run("ABC", "vu").text(), "aBC");
}

#[test]
fn block_insert_repeats_on_every_line() {
    let h = run("ab\ncd\nef", "\u{16}jjI-\u{1b}");
    assert_eq!(h.text(), "-ab\n-cd\n-ef");
    assert_eq!(h.vi.mode(), Mode::Normal);
}

#[test]
fn block_change_replaces_columns() {
    let h = run("abc\nabc", "l\u{16}jlcX\u{1b}");
    assert_eq!(h.text(), "aX\naX");
}

#[test]
fn block_append_after_right_edge() {
    let h = run("ab\nab", "\u{16}jA!\u{1b}");
    assert_eq!(h.text(), "a!b\na!b");
}

#[test]
fn visual_change_enters_insert() {
    let mut h = run("hello world", "vllllc");
    assert_eq!(h.vi.mode(), Mode::Insert);
    assert!(h.surface.borrow().selection().is_none());
    h.keys("bye\u{1b}");
    assert_eq!(h.text(), "bye world");
}

#[test]
fn invalid_command_is_dropped() {
    let mut h = Harness::new("abc");
    assert!(!h.vi.key('z'));
    assert!(h.vi.ex_command().is_empty());
    assert_eq!(h.text(), "abc");
}

#[test]
fn goto_line_motions() {
    let h = run("1\n2\n  3", "G");
    assert_eq!(h.cursor(), (2, 2));
    let h = run("1\n2\n3", "G2G");
    assert_eq!(h.cursor(), (1, 0));
    let h = run("1\n2\n3", "Ggg");
    assert_eq!(h.cursor(), (0, 0));
}
