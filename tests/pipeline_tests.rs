//! End-to-end tests: messages through segmentation, rendering and diagram fill-in.

mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use career_chat::config::BubbleTheme;
use career_chat::diagrams::{ContainerRef, EngineState, ExportFormat};
use career_chat::markdown::{BlockNode, Element};
use career_chat::message::{Message, Sender};
use career_chat::view::{MessageView, render_transcript};
use common::pipeline;

fn diagram_message(sender: Sender, source: &str) -> Message {
    Message::new(
        sender,
        format!("Here is the plan:\n\n```mermaid\n{source}\n```"),
        1_700_000_000_000,
    )
}

#[tokio::test]
async fn test_single_diagram_filled_into_its_placeholder() {
    let p = pipeline();
    let message = Message::new(Sender::Assistant, "```mermaid\ngraph TD; A-->B\n```", 0);
    let views = render_transcript(&[message], &p.renderer, &p.adapter).await;

    let view = &views[0];
    assert_eq!(view.blocks().len(), 1);
    let BlockNode::DiagramBlock { id, source } = &view.blocks()[0] else {
        panic!("expected diagram block");
    };
    assert_eq!(source, "graph TD; A-->B");

    let placeholders: Vec<_> = view
        .tree()
        .elements
        .iter()
        .filter(|el| matches!(el, Element::DiagramPlaceholder { .. }))
        .collect();
    assert_eq!(placeholders.len(), 1);
    assert_eq!(view.tree().diagram_ids(), vec![id]);

    let container = ContainerRef::for_diagram(id);
    assert_eq!(p.host.attach_count(&container), 1);
    assert!(p.adapter.is_processed(id));
    assert_eq!(p.adapter.engine_state(), EngineState::Ready);
}

#[tokio::test]
async fn test_two_messages_same_tick_both_filled() {
    let p = pipeline();
    // The first diagram finishes last.
    let messages = [
        diagram_message(Sender::User, "graph TD; slow-->A"),
        diagram_message(Sender::Assistant, "graph LR; B-->C"),
    ];
    let views = render_transcript(&messages, &p.renderer, &p.adapter).await;

    let ids: Vec<_> = views
        .iter()
        .flat_map(|view| view.tree().diagram_ids().into_iter().cloned())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    for id in &ids {
        assert_eq!(p.host.attach_count(&ContainerRef::for_diagram(id)), 1);
    }
    assert_eq!(p.loader.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_diagrams_follow_their_author_bubble() {
    let p = pipeline();
    let messages = [
        diagram_message(Sender::User, "graph TD; A-->B"),
        diagram_message(Sender::Assistant, "graph TD; A-->B"),
    ];
    let views = render_transcript(&messages, &p.renderer, &p.adapter).await;

    let fill_of = |theme: BubbleTheme| {
        let [r, g, b] = theme.background;
        format!(r#"fill="rgb({r},{g},{b})""#)
    };
    let graphic = |view: &MessageView| {
        let id = view.tree().diagram_ids()[0].clone();
        p.host.graphic(&ContainerRef::for_diagram(&id)).expect("diagram filled")
    };
    assert!(graphic(&views[0]).contains(&fill_of(BubbleTheme::user())));
    assert!(graphic(&views[1]).contains(&fill_of(BubbleTheme::assistant())));
}

#[tokio::test]
async fn test_diagram_ids_unique_across_many_messages() {
    let p = pipeline();
    let messages: Vec<Message> = (0..20)
        .map(|i| {
            Message::new(
                Sender::Assistant,
                format!("```mermaid\ngraph TD; A-->B\n```\ntext {i}\n```mermaid\ngraph TD; A-->B\n```"),
                i,
            )
        })
        .collect();
    let views = render_transcript(&messages, &p.renderer, &p.adapter).await;

    let ids: HashSet<_> = views
        .iter()
        .flat_map(|view| view.tree().diagram_ids().into_iter().cloned())
        .collect();
    assert_eq!(ids.len(), 40);
    assert_eq!(p.adapter.placement_count(), 40);
    assert_eq!(p.loader.renders.load(Ordering::SeqCst), 40);
}

#[tokio::test]
async fn test_rerender_never_fills_twice() {
    let p = pipeline();
    let message = diagram_message(Sender::Assistant, "graph TD; A-->B");
    let mut view = MessageView::mount(&message, &p.renderer, &p.adapter);
    p.adapter.process_pending().await;

    for _ in 0..3 {
        view.rerender(&p.renderer, &p.adapter);
        p.adapter.reschedule_unprocessed();
        p.adapter.process_pending().await;
    }

    let id = view.tree().diagram_ids()[0].clone();
    assert_eq!(p.host.attach_count(&ContainerRef::for_diagram(&id)), 1);
    assert_eq!(p.loader.renders.load(Ordering::SeqCst), 1);
    assert_eq!(p.adapter.placement_count(), 1);
}

#[tokio::test]
async fn test_bad_diagram_does_not_affect_others() {
    let p = pipeline();
    let messages = [
        diagram_message(Sender::Assistant, "graph TD; broken"),
        Message::new(Sender::User, "Thanks! See **www.example.com**", 1),
        diagram_message(Sender::Assistant, "graph TD; A-->B"),
    ];
    let views = render_transcript(&messages, &p.renderer, &p.adapter).await;

    let bad = views[0].tree().diagram_ids()[0].clone();
    let good = views[2].tree().diagram_ids()[0].clone();
    let bad_container = ContainerRef::for_diagram(&bad);

    assert!(p.host.graphic(&bad_container).is_none());
    assert!(p.host.notice(&bad_container).is_some());
    assert!(p.adapter.is_processed(&bad));
    assert!(p.host.graphic(&ContainerRef::for_diagram(&good)).is_some());

    let html = views[0].to_html(&p.renderer, p.host.as_ref());
    assert!(html.contains(r#"class="diagram-notice""#));
    assert!(views[1].tree().diagram_ids().is_empty());
}

#[tokio::test]
async fn test_unmounted_view_is_never_filled() {
    let p = pipeline();
    let first = MessageView::mount(
        &diagram_message(Sender::User, "graph TD; A-->B"),
        &p.renderer,
        &p.adapter,
    );
    let second = MessageView::mount(
        &diagram_message(Sender::Assistant, "graph TD; C-->D"),
        &p.renderer,
        &p.adapter,
    );

    assert_eq!(first.unmount(&p.adapter), 1);
    assert!(!first.is_mounted());
    p.adapter.process_pending().await;

    let gone = first.tree().diagram_ids()[0].clone();
    let kept = second.tree().diagram_ids()[0].clone();
    assert_eq!(p.host.attach_count(&ContainerRef::for_diagram(&gone)), 0);
    assert_eq!(p.host.attach_count(&ContainerRef::for_diagram(&kept)), 1);
    assert_eq!(p.adapter.placement_count(), 1);
}

#[tokio::test]
async fn test_html_page_contains_filled_diagram_and_timestamp() {
    let p = pipeline();
    let views = render_transcript(
        &[diagram_message(Sender::Assistant, "graph TD; A-->B")],
        &p.renderer,
        &p.adapter,
    )
    .await;

    let html = views[0].to_html(&p.renderer, p.host.as_ref());
    let id = views[0].tree().diagram_ids()[0].clone();
    assert!(html.contains(&format!(r#"id="{id}" data-processed="true""#)));
    assert!(html.contains("<svg"));
    assert!(html.contains(r#"<time class="timestamp message-assistant">"#));
    assert!(!views[0].timestamp_label().is_empty());
}

#[tokio::test]
async fn test_export_after_fill() {
    let p = pipeline();
    let views = render_transcript(
        &[diagram_message(Sender::User, "graph TD; A-->B")],
        &p.renderer,
        &p.adapter,
    )
    .await;
    let id = views[0].tree().diagram_ids()[0].clone();

    let path = p
        .adapter
        .export(&id, ExportFormat::Svg)
        .unwrap()
        .expect("filled diagram exports");
    assert!(path.starts_with(p.dir.path()));
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("<svg"));
}

#[test]
fn test_plain_messages_need_no_engine() {
    let p = pipeline();
    let message = Message::new(Sender::User, "## Goals\n\n- Land a **staff** role\n- Learn Rust", 0);
    let view = MessageView::mount(&message, &p.renderer, &p.adapter);

    assert_eq!(
        view.blocks().iter().map(BlockNode::kind_name).collect::<Vec<_>>(),
        vec!["heading", "list"]
    );
    assert_eq!(p.adapter.queued_count(), 0);
    assert_eq!(p.adapter.engine_state(), EngineState::Unloaded);
    assert_eq!(view.sender(), Sender::User);
}
