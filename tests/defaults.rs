//! Default strategy construction and rendering over a realistic type table.

use std::collections::BTreeMap;

use msg_smith::{RenderConfig, StrategyMap, TopStrategy, TypeTable, TypeToken};

fn fields(decls: &[(&str, TypeToken)]) -> BTreeMap<String, TypeToken> {
    decls
        .iter()
        .map(|(name, token)| (name.to_string(), token.clone()))
        .collect()
}

fn table() -> TypeTable {
    let mut entries = BTreeMap::new();
    entries.insert(
        "geometry_msgs/Vector3".to_owned(),
        fields(&[
            ("x", TypeToken::new("float64")),
            ("y", TypeToken::new("float64")),
            ("z", TypeToken::new("float64")),
        ]),
    );
    entries.insert(
        "geometry_msgs/Twist".to_owned(),
        fields(&[
            ("linear", TypeToken::new("geometry_msgs/Vector3")),
            ("angular", TypeToken::new("geometry_msgs/Vector3")),
        ]),
    );
    entries.insert(
        "kobuki_msgs/BumperEvent".to_owned(),
        fields(&[
            ("bumper", TypeToken::new("uint8")),
            ("state", TypeToken::new("uint8")),
        ]),
    );
    entries.insert(
        "pkg/Msg".to_owned(),
        fields(&[
            ("flag", TypeToken::new("bool")),
            ("label", TypeToken::new("string")),
            ("stamp", TypeToken::new("time")),
            ("twist", TypeToken::new("geometry_msgs/Twist")),
            ("int_array", TypeToken::fixed_array("int32", 3)),
            ("int_list", TypeToken::var_array("int32")),
            ("twist_array", TypeToken::fixed_array("geometry_msgs/Twist", 2)),
        ]),
    );
    TypeTable::new(entries).expect("test table is well formed")
}

// ============================================================================
// Field coverage
// ============================================================================

#[test]
fn every_default_tree_has_exactly_the_declared_fields() {
    let registry = StrategyMap::new(table());
    let declarations = table();
    for (msg_type, decls) in declarations.iter() {
        let Some(TopStrategy::Msg(strategy)) = registry.default_strategy(msg_type) else {
            panic!("missing default tree for {msg_type}");
        };
        let tree_fields: Vec<&str> = strategy.fields().map(|(name, _)| name).collect();
        let declared: Vec<&str> = decls.keys().map(String::as_str).collect();
        assert_eq!(tree_fields, declared, "field mismatch for {msg_type}");
        assert!(strategy.is_default());
    }
}

#[test]
fn every_default_tree_renders_without_error() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let cfg = RenderConfig::default();
    let declarations = table();
    for (msg_type, _) in declarations.iter() {
        let code = registry.render_default(msg_type, &cfg)?;
        assert!(code.contains("def "), "no procedure emitted for {msg_type}");
        assert!(code.ends_with("return msg"));
    }
    Ok(())
}

// ============================================================================
// Emitted text
// ============================================================================

#[test]
fn vector3_renders_the_expected_procedure() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let code = registry.render_default("geometry_msgs/Vector3", &RenderConfig::default())?;
    let expected = concat!(
        "@strategies.composite\n",
        "def geometry_msgs_Vector3(draw):\n",
        "    msg = geometry_msgs.Vector3()\n",
        "    msg.x = draw(ros_float64())\n",
        "    msg.y = draw(ros_float64())\n",
        "    msg.z = draw(ros_float64())\n",
        "    return msg"
    );
    assert_eq!(code, expected);
    Ok(())
}

#[test]
fn composite_fields_draw_from_their_type_strategy() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let code = registry.render_default("geometry_msgs/Twist", &RenderConfig::default())?;
    assert!(code.contains("msg.angular = draw(geometry_msgs_Vector3())"));
    assert!(code.contains("msg.linear = draw(geometry_msgs_Vector3())"));
    Ok(())
}

#[test]
fn fixed_arrays_sample_the_length_then_each_element() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let code = registry.render_default("pkg/Msg", &RenderConfig::default())?;
    let skeleton = code
        .find("msg.int_array = draw(strategies.lists(min_size=3, max_size=3))")
        .expect("array skeleton");
    for i in 0..3 {
        let elem = code
            .find(&format!("msg.int_array[{i}] = draw(ros_int32())"))
            .expect("array element");
        assert!(elem > skeleton, "element assigned before length sampled");
    }
    Ok(())
}

#[test]
fn variable_arrays_render_one_atomic_block() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let code = registry.render_default("pkg/Msg", &RenderConfig::default())?;
    let block = concat!(
        "    msg.int_list = draw(strategies.lists(min_size=0, max_size=256))\n",
        "    for i in range(len(msg.int_list)):\n",
        "        msg.int_list[i] = draw(ros_int32())"
    );
    assert!(code.contains(block), "missing block in:\n{code}");
    Ok(())
}

#[test]
fn record_constructor_precedes_field_assignments() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let code = registry.render_default("pkg/Msg", &RenderConfig::default())?;
    let ctor = code.find("msg = pkg.Msg()").expect("constructor");
    let first_field = code.find("msg.flag").expect("field assignment");
    assert!(ctor < first_field);
    Ok(())
}

// ============================================================================
// Builtins
// ============================================================================

#[test]
fn builtin_scalars_render() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let cfg = RenderConfig::default();
    assert!(registry.render_default("bool", &cfg)?.contains("def ros_bool():"));
    assert!(registry
        .render_default("uint8", &cfg)?
        .contains("def ros_uint8(min_value=0, max_value=255):"));
    assert!(registry
        .render_default("time", &cfg)?
        .contains("return rospy.Time(secs, nsecs)"));
    assert!(registry
        .render_default("std_msgs/Header", &cfg)?
        .contains("msg.frame_id = draw(ros_string())"));
    Ok(())
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn rendering_fresh_trees_twice_is_textually_identical() -> anyhow::Result<()> {
    let cfg = RenderConfig::default();
    let mut first = StrategyMap::new(table());
    let mut second = StrategyMap::new(table());
    let declarations = table();
    for (msg_type, _) in declarations.iter() {
        assert_eq!(
            first.render_default(msg_type, &cfg)?,
            second.render_default(msg_type, &cfg)?
        );
    }
    Ok(())
}

#[test]
#[should_panic(expected = "already been rendered")]
fn rendering_a_tree_twice_panics() {
    let mut registry = StrategyMap::new(table());
    let cfg = RenderConfig::default();
    registry
        .render_default("geometry_msgs/Vector3", &cfg)
        .expect("first render");
    let _ = registry.render_default("geometry_msgs/Vector3", &cfg);
}
