//! Registry behavior: custom groups, dependency closures, completion, and
//! group-local strategy references.

use std::collections::BTreeMap;

use msg_smith::{
    Error, PathStep, RenderConfig, StrategyMap, TopStrategy, TypeTable, TypeToken,
};

fn table() -> TypeTable {
    let mut vec3 = BTreeMap::new();
    vec3.insert("x".to_owned(), TypeToken::new("float64"));
    vec3.insert("y".to_owned(), TypeToken::new("float64"));
    vec3.insert("z".to_owned(), TypeToken::new("float64"));

    let mut twist = BTreeMap::new();
    twist.insert("linear".to_owned(), TypeToken::new("geometry_msgs/Vector3"));
    twist.insert("angular".to_owned(), TypeToken::new("geometry_msgs/Vector3"));

    let mut msg = BTreeMap::new();
    msg.insert("twist".to_owned(), TypeToken::new("geometry_msgs/Twist"));
    msg.insert("count".to_owned(), TypeToken::new("int32"));

    let mut cyc_a = BTreeMap::new();
    cyc_a.insert("next".to_owned(), TypeToken::new("pkg/CycB"));
    let mut cyc_b = BTreeMap::new();
    cyc_b.insert("back".to_owned(), TypeToken::new("pkg/CycA"));

    let mut entries = BTreeMap::new();
    entries.insert("geometry_msgs/Vector3".to_owned(), vec3);
    entries.insert("geometry_msgs/Twist".to_owned(), twist);
    entries.insert("pkg/Msg".to_owned(), msg);
    entries.insert("pkg/CycA".to_owned(), cyc_a);
    entries.insert("pkg/CycB".to_owned(), cyc_b);
    TypeTable::new(entries).expect("test table is well formed")
}

// ============================================================================
// Creation invariants
// ============================================================================

#[test]
fn creating_the_same_pair_twice_is_an_error() {
    let mut registry = StrategyMap::new(table());
    registry.make_custom("g", "pkg/Msg").unwrap();
    assert!(matches!(
        registry.make_custom("g", "pkg/Msg"),
        Err(Error::AlreadyDefined { .. })
    ));
    // The same type under another group is fine.
    assert!(registry.make_custom("h", "pkg/Msg").is_ok());
}

#[test]
fn unknown_types_are_rejected() {
    let mut registry = StrategyMap::new(table());
    assert!(matches!(
        registry.make_custom("g", "pkg/Nope"),
        Err(Error::UnknownType(_))
    ));
}

#[test]
fn custom_trees_are_named_after_group_and_type() {
    let mut registry = StrategyMap::new(table());
    let tree = registry.make_custom("g", "pkg/Msg").unwrap();
    assert_eq!(tree.name(), "g_pkg_Msg");
    assert_eq!(tree.msg_type(), "pkg/Msg");
}

// ============================================================================
// Dependency closures
// ============================================================================

#[test]
fn make_custom_tree_covers_the_transitive_closure() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    registry.make_custom_tree("g", "pkg/Msg")?;
    assert!(registry.get_custom("g", "pkg/Msg").is_some());
    assert!(registry.get_custom("g", "geometry_msgs/Twist").is_some());
    assert!(registry.get_custom("g", "geometry_msgs/Vector3").is_some());
    Ok(())
}

#[test]
fn make_custom_tree_terminates_on_type_level_cycles() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    registry.make_custom_tree("g", "pkg/CycA")?;
    assert!(registry.get_custom("g", "pkg/CycA").is_some());
    assert!(registry.get_custom("g", "pkg/CycB").is_some());
    // Recreating the root is still a redefinition.
    assert!(matches!(
        registry.make_custom_tree("g", "pkg/CycA"),
        Err(Error::AlreadyDefined { .. })
    ));
    Ok(())
}

#[test]
fn group_trees_reference_group_local_strategies() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    registry.make_custom_tree("g", "pkg/Msg")?;
    registry
        .get_custom_mut("g", "geometry_msgs/Vector3")
        .expect("closure member")
        .field_mut(&[PathStep::field("z")])?
        .eq(0.0)?;
    registry.complete_custom_strategies();
    let cfg = RenderConfig::default();
    let root = registry.render_custom("g", "pkg/Msg", &cfg)?;
    assert!(root.contains("msg.twist = draw(g_geometry_msgs_Twist())"));
    let twist = registry.render_custom("g", "geometry_msgs/Twist", &cfg)?;
    assert!(twist.contains("msg.linear = draw(g_geometry_msgs_Vector3())"));
    let vec3 = registry.render_custom("g", "geometry_msgs/Vector3", &cfg)?;
    assert!(vec3.contains("msg.z = 0.0"));
    Ok(())
}

// ============================================================================
// Completion
// ============================================================================

#[test]
fn completion_fills_untouched_trees_to_the_default_field_set() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    registry.make_custom("g", "pkg/Msg")?;
    registry.complete_custom_strategies();
    let custom = registry.get_custom("g", "pkg/Msg").expect("created");
    let Some(TopStrategy::Msg(default)) = registry.default_strategy("pkg/Msg") else {
        panic!("missing default tree");
    };
    let custom_fields: Vec<&str> = custom.fields().map(|(name, _)| name).collect();
    let default_fields: Vec<&str> = default.fields().map(|(name, _)| name).collect();
    assert_eq!(custom_fields, default_fields);
    assert!(custom.is_default());
    Ok(())
}

#[test]
fn completed_unconstrained_trees_render_the_same_body_as_the_default() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    registry.make_custom("g", "geometry_msgs/Vector3")?;
    registry.complete_custom_strategies();
    let cfg = RenderConfig::default();
    let default_code = registry.render_default("geometry_msgs/Vector3", &cfg)?;
    let custom_code = registry.render_custom("g", "geometry_msgs/Vector3", &cfg)?;
    // Same statements, different procedure name.
    let default_body: Vec<&str> = default_code.lines().skip(2).collect();
    let custom_body: Vec<&str> = custom_code.lines().skip(2).collect();
    assert_eq!(default_body, custom_body);
    assert!(custom_code.contains("def g_geometry_msgs_Vector3(draw):"));
    Ok(())
}

#[test]
fn completion_does_not_disturb_constrained_fields() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let tree = registry.make_custom("g", "pkg/Msg")?;
    tree.field_mut(&[PathStep::field("count")])?.eq(3i64)?;
    registry.complete_custom_strategies();
    let code = registry.render_custom("g", "pkg/Msg", &RenderConfig::default())?;
    assert!(code.contains("msg.count = 3"));
    assert!(code.contains("msg.twist = draw(geometry_msgs_Twist())"));
    Ok(())
}

// ============================================================================
// Serialized type tables
// ============================================================================

#[cfg(feature = "serde")]
#[test]
fn type_tables_round_trip_through_serde() -> anyhow::Result<()> {
    let original = table();
    let json = serde_json::to_string(&original)?;
    let restored: TypeTable = serde_json::from_str(&json)?;
    assert_eq!(original, restored);
    Ok(())
}
