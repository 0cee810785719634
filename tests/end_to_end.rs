use std::fs;

use eframe::egui::{Pos2, vec2};
use pretty_assertions::assert_eq;

use topology_viewer::config::ViewerConfig;
use topology_viewer::layout::{SnapshotUpdate, TopologyView};
use topology_viewer::topology::{TopologySnapshot, load_snapshot};

const SNAPSHOT: &str = r#"{
    "nodes": [
        { "id": "a", "namespace": "x", "metrics": { "rps": 40, "errorRate": 0.5 } },
        { "id": "b", "namespace": "x", "metrics": { "rps": 12, "errorRate": 2.5 } },
        { "id": "c", "namespace": "y", "metrics": { "rps": 9, "errorRate": 7 } }
    ],
    "edges": [
        { "sourceId": "a", "targetId": "b", "metrics": { "rps": 12 } },
        { "sourceId": "a", "targetId": "c", "metrics": { "rps": 9 } }
    ],
    "latency": {
        "b": { "buckets": [ { "upperBoundMs": 10, "count": 6 },
                            { "upperBoundMs": 100, "count": 3 },
                            { "upperBoundMs": "+Inf", "count": 1 } ] }
    }
}"#;

fn view_for(raw: &str) -> TopologyView {
    let snapshot = raw.parse::<TopologySnapshot>().unwrap();
    let mut view = TopologyView::new(ViewerConfig::default(), vec2(1000.0, 700.0));
    view.apply_snapshot(snapshot);
    view
}

fn ids(view: &TopologyView, indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .map(|&index| view.graph().nodes[index].id.clone())
        .collect()
}

#[test]
fn layers_and_lanes_for_small_topology() {
    let view = view_for(SNAPSHOT);

    let mut layers = view
        .layers()
        .by_id(view.graph())
        .into_iter()
        .map(|(id, layer)| (id.to_owned(), layer))
        .collect::<Vec<_>>();
    layers.sort();
    assert_eq!(
        layers,
        vec![("a".to_owned(), 0), ("b".to_owned(), 1), ("c".to_owned(), 1)]
    );

    let lanes = view
        .lanes()
        .iter()
        .map(|lane| (lane.namespace.clone(), ids(&view, &lane.node_indices)))
        .collect::<Vec<_>>();
    assert_eq!(
        lanes,
        vec![
            ("x".to_owned(), vec!["a".to_owned(), "b".to_owned()]),
            ("y".to_owned(), vec!["c".to_owned()]),
        ]
    );

    let positions = view.positions();
    let (a, b, c) = (
        positions.get(0).unwrap(),
        positions.get(1).unwrap(),
        positions.get(2).unwrap(),
    );
    assert!(a.x < b.x);
    assert_eq!(b.x, c.x);
    assert!(view.lanes()[0].bounds.contains(a));
    assert!(view.lanes()[1].bounds.contains(c));
}

#[test]
fn statuses_follow_error_rate() {
    let view = view_for(SNAPSHOT);
    let labels = view
        .graph()
        .nodes
        .iter()
        .map(|node| node.status.label())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["healthy", "warning", "critical"]);
}

#[test]
fn metric_refresh_keeps_layout_but_new_service_rebuilds_it() {
    let mut view = view_for(SNAPSHOT);

    view.zoom_by(1.25);
    view.pan_by(vec2(-35.0, 20.0));
    let dragged = view.node_screen_position(1).unwrap();
    view.pointer_down(dragged);
    view.pointer_move(dragged + vec2(60.0, 0.0));
    view.pointer_up(dragged + vec2(60.0, 0.0));

    let positions = view.positions().clone();
    let viewport = view.viewport().clone();

    let refreshed = SNAPSHOT.replace("\"rps\": 40", "\"rps\": 400");
    let update = view.apply_snapshot(refreshed.parse().unwrap());
    assert_eq!(update, SnapshotUpdate::MetricsMerged);
    assert_eq!(view.positions(), &positions);
    assert_eq!(view.viewport(), &viewport);
    assert_eq!(view.graph().node("a").unwrap().metrics.rps, 400.0);

    let grown = SNAPSHOT.replace(
        r#"{ "id": "c", "namespace": "y","#,
        r#"{ "id": "d", "namespace": "y" }, { "id": "c", "namespace": "y","#,
    );
    let update = view.apply_snapshot(grown.parse().unwrap());
    assert_eq!(update, SnapshotUpdate::Reset);
    assert_eq!(view.graph().node_count(), 4);
    assert_eq!(view.viewport(), view_for(&grown).viewport());
}

#[test]
fn selection_drives_histogram_and_callback() {
    let mut view = view_for(SNAPSHOT);
    let selected = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = selected.clone();
    view.set_selection_callback(Box::new(move |id: &str| sink.borrow_mut().push(id.to_owned())));

    let b = view.node_screen_position(1).unwrap();
    view.pointer_down(b);
    view.pointer_up(b + vec2(1.0, 1.0));

    assert_eq!(view.interaction().selected_id(), Some("b"));
    assert_eq!(*selected.borrow(), vec!["b".to_owned()]);

    let histogram = view.selected_histogram().unwrap();
    assert_eq!(histogram.bars.len(), 2);
    assert_eq!(histogram.total_count, 10);
    assert_eq!(histogram.overflow_count, 1);
    assert_eq!(histogram.axis.lo, 5.0);
    assert_eq!(histogram.axis.hi, 200.0);

    view.pointer_down(Pos2::new(2.0, 2.0));
    view.pointer_up(Pos2::new(2.0, 2.0));
    assert_eq!(view.interaction().selected_id(), None);
    assert_eq!(selected.borrow().len(), 1);
}

#[test]
fn loads_snapshot_from_disk() {
    let path = std::env::temp_dir().join(format!("topology-viewer-{}.json", std::process::id()));
    fs::write(&path, SNAPSHOT).unwrap();

    let snapshot = load_snapshot(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(snapshot.graph.node_count(), 3);
    assert_eq!(snapshot.graph.edge_count(), 2);
    assert!(snapshot.latency.contains_key("b"));

    let missing = load_snapshot(&path).unwrap_err();
    assert!(format!("{missing:#}").contains("failed to read topology snapshot"));
}
