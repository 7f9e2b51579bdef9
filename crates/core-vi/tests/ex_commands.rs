mod common;

use common::{EchoRunner, Harness};
use core_vi::TEXT_PANE;
use pretty_assertions::assert_eq;

#[test]
fn goto_line_lands_on_first_non_blank() {
    let mut h = Harness::new("1\n2\n  3");
    h.keys(":3\r");
    assert_eq!(h.cursor(), (2, 2));
    assert!(h.vi.ex_command().is_empty());
}

#[test]
fn substitute_whole_buffer() {
    let mut h = Harness::new("foo\nboo\nbar");
    assert!(h.vi.command(":%s/o/0/g"));
    assert_eq!(h.text(), "f00\nb00\nbar");
    assert_eq!(h.status.last(TEXT_PANE).as_deref(), Some("2 lines changed"));

    assert!(!h.vi.command(":%s/zzz/y/"));
    assert_eq!(h.status.last(TEXT_PANE).as_deref(), Some("pattern not found: zzz"));
}

#[test]
fn substitute_with_groups_on_range() {
    let mut h = Harness::new("a-b\na-b\na-b");
    assert!(h.vi.command(":2,3s/(a)-(b)/\\2-\\1/"));
    assert_eq!(h.text(), "a-b\nb-a\nb-a");
}

#[test]
fn delete_range_fills_register() {
    let mut h = Harness::new("1\n2\n3\n4");
    h.keys(":2,3d\r");
    assert_eq!(h.text(), "1\n4");
    assert_eq!(h.register('"').as_deref(), Some("2\n3\n"));
}

#[test]
fn find_forward_repeat_and_backward() {
    let mut h = Harness::new("abc\nabc");
    h.keys("/b\r");
    assert_eq!(h.cursor(), (0, 1));
    h.keys("/\r");
    assert_eq!(h.cursor(), (1, 1));
    h.keys("?c\r");
    assert_eq!(h.cursor(), (0, 2));

    assert!(!h.vi.command("/nothing"));
    assert_eq!(h.status.last(TEXT_PANE).as_deref(), Some("pattern not found: nothing"));
}

#[test]
fn backspace_edits_the_line_command() {
    let mut h = Harness::new("1\n2\n3");
    h.keys(":33\u{8}\r");
    assert_eq!(h.cursor(), (2, 0));
}

#[test]
fn escape_abandons_the_line_command() {
    let mut h = Harness::new("1\n2\n3");
    h.keys(":3\u{1b}");
    assert!(h.vi.ex_command().is_empty());
    assert_eq!(h.cursor(), (0, 0));
}

#[test]
fn calculator_reports_result() {
    let mut h = Harness::new("");
    assert!(h.vi.command("=2*(3+4)"));
    assert_eq!(h.status.last(TEXT_PANE).as_deref(), Some("14"));
    assert!(!h.vi.command("=1/0"));
    assert_eq!(h.status.last(TEXT_PANE).as_deref(), Some("division by zero"));
}

#[test]
fn exec_needs_a_runner() {
    let mut h = Harness::new("");
    assert!(!h.vi.command("!ls"));
    assert_eq!(
        h.status.last(TEXT_PANE).as_deref(),
        Some("process execution unavailable")
    );

    let mut h = Harness::new("").map_vi(|vi| vi.with_process(Box::new(EchoRunner)));
    assert!(h.vi.command("!echo hi"));
    assert_eq!(h.status.last(TEXT_PANE).as_deref(), Some("ran echo hi"));
    assert!(!h.vi.command("!false"));
    assert_eq!(
        h.status.last(TEXT_PANE).as_deref(),
        Some("false: exit status 1")
    );
}

#[test]
fn set_readonly_blocks_edits() {
    let mut h = Harness::new("abc");
    assert!(h.vi.command(":set ro"));
    assert!(h.vi.is_readonly());
    h.keys("x");
    assert_eq!(h.text(), "abc");
    assert_eq!(h.status.last(TEXT_PANE).as_deref(), Some("readonly"));
    h.keys("ix");
    assert_eq!(h.text(), "abc");

    assert!(h.vi.command(":set noro"));
    h.keys("x");
    assert_eq!(h.text(), "bc");
}

#[test]
fn edit_without_workspace() {
    let mut h = Harness::new("");
    assert!(!h.vi.command(":e other"));
    assert_eq!(h.status.last(TEXT_PANE).as_deref(), Some("no workspace"));
}

#[test]
fn listings() {
    let mut h = Harness::with_macros("abc", &[("a", "x"), ("b", "y")]);
    h.keys("yy");
    assert!(h.vi.command(":reg"));
    let listing = h.status.last(TEXT_PANE).unwrap();
    assert!(listing.starts_with("\"\" abc\\n"), "{listing}");

    assert!(h.vi.command(":macros"));
    assert_eq!(h.status.last("PaneMacro").as_deref(), Some("a b"));
}

#[test]
fn unknown_command_is_reported() {
    let mut h = Harness::new("");
    assert!(!h.vi.command(":bogus"));
    assert_eq!(
        h.status.last(TEXT_PANE).as_deref(),
        Some("unknown command: bogus")
    );
}
