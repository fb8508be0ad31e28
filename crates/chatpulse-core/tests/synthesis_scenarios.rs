use chatpulse_core::{
    count_members, synthesize_graph, ActivityBatch, ChannelActivity, ChatRoom, Color, ColorBand,
    ColorTable, DomainStats, GraphSynthesizer, MetricKey, PresenceMap, RoomBands, RoomType,
    ScaleConfig,
};

fn activity(
    id: &str,
    name: &str,
    room_type: RoomType,
    active: u64,
    inactive: u64,
    messages: u64,
) -> ChannelActivity {
    ChannelActivity {
        id: id.into(),
        name: name.into(),
        room_type,
        member_count: active + inactive,
        active_member_count: active,
        inactive_member_count: inactive,
        message_count: messages,
    }
}

fn two_room_batch() -> ActivityBatch {
    let (batch, rejected) = ActivityBatch::collect(vec![
        activity("CA", "A", RoomType::Channel, 8, 2, 5),
        activity("CB", "B", RoomType::Channel, 90, 10, 50),
    ]);
    assert!(rejected.is_empty());
    batch
}

fn node_size(graph: &chatpulse_core::ActivityGraph, id: &str) -> u32 {
    graph
        .nodes
        .iter()
        .find(|n| n.id == id)
        .and_then(|n| n.size)
        .unwrap()
}

#[test]
fn test_two_room_scenario() {
    let batch = two_room_batch();
    let graph = synthesize_graph(
        &batch,
        &ColorTable::default(),
        ScaleConfig::default(),
        "10:00 event created",
    )
    .unwrap();

    assert_eq!(graph.nodes.len(), 10);
    assert_eq!(graph.entity_count(), 2);
    assert_eq!(graph.metric_count(), 8);
    assert_eq!(graph.links.len(), 8);

    let stats = DomainStats::compute(&batch, ScaleConfig::default()).unwrap();
    let messages = stats.function(MetricKey::Messages).domain();
    assert_eq!((messages.min, messages.max), (5, 50));

    assert_eq!(node_size(&graph, "CA-messages"), 10);
    assert_eq!(node_size(&graph, "CB-messages"), 30);
    assert_eq!(node_size(&graph, "CA-members"), 10);
    assert_eq!(node_size(&graph, "CB-members"), 30);
}

#[test]
fn test_node_and_link_counts_scale_with_batch() {
    let rooms: Vec<ChannelActivity> = (0..7u64)
        .map(|i| {
            activity(
                &format!("C{}", i),
                &format!("room-{}", i),
                if i % 2 == 0 { RoomType::Channel } else { RoomType::Group },
                i * 3,
                i,
                i * i,
            )
        })
        .collect();
    let (batch, _) = ActivityBatch::collect(rooms);
    let graph =
        synthesize_graph(&batch, &ColorTable::default(), ScaleConfig::default(), "m").unwrap();

    assert_eq!(graph.entity_count(), 7);
    assert_eq!(graph.metric_count(), 28);
    assert_eq!(graph.links.len(), 28);
    assert!(graph.integrity_violations().is_empty());
    for link in &graph.links {
        assert!(graph.contains_node(&link.source_node_id));
        assert!(graph.contains_node(&link.target_node_id));
    }
    for node in graph.nodes.iter().filter(|n| n.is_metric()) {
        let size = node.size.unwrap();
        assert!((10..=30).contains(&size), "{} out of range: {}", node.id, size);
    }
}

#[test]
fn test_synthesis_is_reproducible() {
    let mut colors = ColorTable::default();
    colors.channel.insert(
        "A".into(),
        RoomBands {
            messages: Some(ColorBand::new(5, 10)),
            ..Default::default()
        },
    );

    let first = synthesize_graph(&two_room_batch(), &colors, ScaleConfig::default(), "m").unwrap();
    let second = synthesize_graph(&two_room_batch(), &colors, ScaleConfig::default(), "m").unwrap();
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[test]
fn test_insertion_order_does_not_change_output() {
    let a = activity("CA", "A", RoomType::Channel, 8, 2, 5);
    let b = activity("CB", "B", RoomType::Group, 90, 10, 50);
    let (forward, _) = ActivityBatch::collect(vec![a.clone(), b.clone()]);
    let (reverse, _) = ActivityBatch::collect(vec![b, a]);

    let colors = ColorTable::default();
    let stats = DomainStats::compute(&forward, ScaleConfig::default()).unwrap();
    let synthesizer = GraphSynthesizer::new(&stats, &colors);
    assert_eq!(
        synthesizer.synthesize("m", &forward),
        synthesizer.synthesize("m", &reverse)
    );
    assert_eq!(synthesizer.synthesize("m", &reverse).nodes[0].id, "CA");
}

#[test]
fn test_room_to_colored_graph() {
    let presence: PresenceMap = [("U1", "away"), ("U2", "active"), ("U3", "away")]
        .into_iter()
        .map(|(id, state)| (id.to_string(), state.to_string()))
        .collect();
    let room = ChatRoom {
        id: "C1".into(),
        name: "denver-pod".into(),
        room_type: RoomType::Channel,
        member_ids: vec!["U1".into(), "U2".into(), "U3".into(), "U4".into()],
    };
    assert_eq!(count_members(&room.member_ids, &presence).inactive, 2);

    let mut colors = ColorTable::default();
    colors.channel.insert(
        "denver-pod".into(),
        RoomBands {
            active_members: Some(ColorBand::new(3, 7)),
            messages: Some(ColorBand::new(2, 4)),
            ..Default::default()
        },
    );
    let (batch, _) = ActivityBatch::collect(vec![ChannelActivity::from_room(&room, &presence, 4)]);
    let graph = synthesize_graph(&batch, &colors, ScaleConfig::default(), "m").unwrap();

    let color = |id: &str| graph.nodes.iter().find(|n| n.id == id).unwrap().color.as_str();
    assert_eq!(color("C1-activeMembers"), Color::Alert.hex());
    assert_eq!(color("C1-messages"), Color::Healthy.hex());
    assert_eq!(color("C1-inactiveMembers"), Color::Neutral.hex());
    assert_eq!(color("C1"), Color::Alert.hex());
}
