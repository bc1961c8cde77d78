use std::sync::{Arc, Mutex};
use std::time::Duration;

use mdflex::document::{Block, MarkdownRenderer};
use mdflex::editor::{EditOperation, FormatCommand};
use mdflex::fs::StdFileSystem;
use mdflex::scheduler::RenderBackend;
use mdflex::session::{Clock, ManualClock, Session, SessionConfig};
use mdflex::theme::Theme;
use mdflex::view::ViewMode;
use proptest::prelude::*;

const SAMPLE: &str = include_str!("fixtures/sample.md");

fn inline_session() -> (Session, ManualClock) {
    let clock = ManualClock::new();
    let config = SessionConfig {
        backend: RenderBackend::Inline,
        ..SessionConfig::default()
    };
    let session = Session::with_parts(config, MarkdownRenderer::default(), Box::new(clock.clone()));
    (session, clock)
}

fn type_text(session: &mut Session, text: &str) {
    for ch in text.chars() {
        let offset = session.cursor();
        session
            .apply_user_edit(EditOperation::insert(offset, ch.to_string()))
            .unwrap();
    }
}

#[test]
fn test_sample_document_renders_every_block_kind() {
    let (mut session, _) = inline_session();
    session.load_document(SAMPLE);
    session.flush();

    let content = session.rendered().unwrap();
    let blocks = content.blocks();
    assert!(blocks.iter().any(|b| matches!(b, Block::Heading { .. })));
    assert!(blocks.iter().any(|b| matches!(b, Block::List(_))));
    assert!(blocks.iter().any(|b| matches!(b, Block::BlockQuote { .. })));
    assert!(blocks.iter().any(|b| matches!(b, Block::Table(_))));
    assert!(blocks.iter().any(|b| matches!(b, Block::ThematicBreak)));

    let languages: Vec<_> = content
        .code_blocks()
        .iter()
        .map(|block| block.language.clone())
        .collect();
    assert_eq!(
        languages,
        vec![Some("rust".to_string()), Some("python".to_string())]
    );
    assert!(content.code_blocks().iter().all(|block| block.highlighted));

    let anchors: Vec<_> = content
        .outline()
        .iter()
        .map(|heading| heading.anchor.as_str())
        .collect();
    assert_eq!(
        anchors,
        vec![
            "release-notes",
            "getting-started",
            "code",
            "getting-started-1"
        ]
    );
}

#[test]
fn test_typing_burst_renders_once_after_quiet_period() {
    let (mut session, clock) = inline_session();
    let renders = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&renders);
    session.subscribe_render(Box::new(move |content| {
        sink.lock().unwrap().push(content.outline().len());
    }));

    for ch in "# Title".chars() {
        let offset = session.cursor();
        session
            .apply_user_edit(EditOperation::insert(offset, ch.to_string()))
            .unwrap();
        clock.advance_ms(10);
        assert!(!session.tick(clock.now()));
    }
    assert!(renders.lock().unwrap().is_empty());

    let wait = session.next_wakeup(clock.now()).unwrap();
    clock.advance(wait);
    assert!(session.tick(clock.now()));
    assert_eq!(*renders.lock().unwrap(), vec![1]);
    assert_eq!(session.displayed_version(), Some(session.version()));
}

#[test]
fn test_open_edit_save_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("notes.md");
    std::fs::write(&source, "# Notes\n").unwrap();

    let (mut session, _) = inline_session();
    session.open(&StdFileSystem, &source).unwrap();
    assert_eq!(session.title(), "notes - MDFlex");

    let end = session.buffer().len_chars();
    session.set_cursor(end);
    type_text(&mut session, "\nSecond line");
    assert!(session.is_dirty());

    let saved = session.save(&StdFileSystem).unwrap();
    assert_eq!(saved, source);
    assert!(!session.is_dirty());
    assert_eq!(
        std::fs::read_to_string(&source).unwrap(),
        "# Notes\n\nSecond line"
    );

    session.set_theme(Theme::Light);
    let exported = session
        .export_to(&StdFileSystem, &dir.path().join("notes"))
        .unwrap();
    assert_eq!(exported, dir.path().join("notes.html"));
    let html = std::fs::read_to_string(&exported).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>notes</title>"));
    assert!(html.contains("Second line"));
}

#[test]
fn test_export_is_stable_across_calls() {
    let (mut session, _) = inline_session();
    session.load_document(SAMPLE);
    let before_render = session.export_html();
    session.flush();
    assert_eq!(session.export_html(), before_render);
}

#[test]
fn test_format_then_undo_restores_text() {
    let (mut session, _) = inline_session();
    session.load_document("make this bold");
    session.select(5..9);
    session.apply_format(FormatCommand::Bold).unwrap();
    assert_eq!(session.current_text(), "make **this** bold");

    session.undo().unwrap();
    assert_eq!(session.current_text(), "make this bold");
    assert!(!session.is_dirty());
}

#[test]
fn test_read_mode_with_hidden_preview_still_renders() {
    let (mut session, _) = inline_session();
    session.set_preview_pane(false);
    let shown = session.displayed_version();
    type_text(&mut session, "*quiet*");
    session.flush();
    assert_eq!(session.displayed_version(), shown);

    session.set_mode(ViewMode::Read);
    assert_eq!(session.displayed_version(), Some(session.version()));
}

#[test]
fn test_thread_backend_reaches_latest_version() {
    let config = SessionConfig {
        backend: RenderBackend::Thread,
        debounce: Duration::from_millis(5),
        ..SessionConfig::default()
    };
    let mut session = Session::new(config);
    type_text(&mut session, "## Threaded");
    session.flush();
    let content = session.rendered().unwrap();
    assert_eq!(content.outline()[0].text, "Threaded");
    assert_eq!(session.displayed_version(), Some(session.version()));
}

#[derive(Debug, Clone)]
enum Step {
    Insert(usize, char),
    Delete(usize, usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (any::<usize>(), prop::char::range('a', 'z')).prop_map(|(at, ch)| Step::Insert(at, ch)),
        (any::<usize>(), 1usize..4).prop_map(|(at, len)| Step::Delete(at, len)),
    ]
}

proptest! {
    #[test]
    fn undo_all_then_redo_all_round_trips(
        initial in "[a-z ]{0,20}",
        steps in prop::collection::vec(step(), 1..30),
    ) {
        let (mut session, clock) = inline_session();
        session.load_document(&initial);

        for step in steps {
            let len = session.buffer().len_chars();
            let op = match step {
                Step::Insert(at, ch) => EditOperation::insert(at % (len + 1), ch.to_string()),
                Step::Delete(_, _) if len == 0 => continue,
                Step::Delete(at, n) => {
                    let offset = at % len;
                    let length = n.min(len - offset);
                    session.buffer().delete_op(offset, length).unwrap()
                }
            };
            session.apply_user_edit(op).unwrap();
            clock.advance_ms(300);
        }
        let edited = session.current_text();

        while session.undo().unwrap().is_some() {}
        prop_assert_eq!(session.current_text(), initial);
        while session.redo().unwrap().is_some() {}
        prop_assert_eq!(session.current_text(), edited);
    }
}
