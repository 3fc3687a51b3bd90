//! Array generator semantics: representative placement, positional pins,
//! broadcasts, and atomic variable-length blocks.

use std::collections::BTreeMap;

use msg_smith::{Error, PathStep, RenderConfig, StrategyMap, TypeTable, TypeToken};

fn table() -> TypeTable {
    let mut fields = BTreeMap::new();
    fields.insert("quad".to_owned(), TypeToken::fixed_array("int32", 4));
    fields.insert("readings".to_owned(), TypeToken::var_array("float64"));
    fields.insert("tags".to_owned(), TypeToken::var_array("string"));
    let mut entries = BTreeMap::new();
    entries.insert("pkg/Arrays".to_owned(), fields);
    TypeTable::new(entries).expect("test table is well formed")
}

// ============================================================================
// Fixed-length arrays
// ============================================================================

#[test]
fn representative_takes_the_lowest_free_index() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let tree = registry.make_custom("g", "pkg/Arrays")?;
    tree.field_mut(&[PathStep::field("quad"), PathStep::index(1)])?
        .eq(5i64)?;
    tree.field_mut(&[PathStep::field("quad"), PathStep::any()])?
        .eq(7i64)?;
    registry.complete_custom_strategies();
    let code = registry.render_custom("g", "pkg/Arrays", &RenderConfig::default())?;
    // Index 1 is pinned, so the representative lands at index 0 and the rest
    // stay default.
    assert!(code.contains("msg.quad[0] = 7"));
    assert!(code.contains("msg.quad[1] = 5"));
    assert!(code.contains("msg.quad[2] = draw(ros_int32())"));
    assert!(code.contains("msg.quad[3] = draw(ros_int32())"));
    assert!(code.contains("assume(msg.quad[0] == 7)"));
    Ok(())
}

#[test]
fn any_index_with_every_slot_pinned_is_an_error() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let tree = registry.make_custom("g", "pkg/Arrays")?;
    for i in 0..4 {
        tree.field_mut(&[PathStep::field("quad"), PathStep::index(i)])?
            .eq(i as i64)?;
    }
    tree.field_mut(&[PathStep::field("quad"), PathStep::any()])?
        .neq(9i64)?;
    registry.complete_custom_strategies();
    let err = registry
        .render_custom("g", "pkg/Arrays", &RenderConfig::default())
        .unwrap_err();
    assert!(matches!(err, Error::NoFreeIndex { ref field } if field == "msg.quad"));
    Ok(())
}

#[test]
fn repeated_any_index_requests_share_one_representative() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let tree = registry.make_custom("g", "pkg/Arrays")?;
    tree.field_mut(&[PathStep::field("quad"), PathStep::any()])?
        .gte(1i64)?;
    tree.field_mut(&[PathStep::field("quad"), PathStep::any()])?
        .lte(9i64)?;
    registry.complete_custom_strategies();
    let code = registry.render_custom("g", "pkg/Arrays", &RenderConfig::default())?;
    assert!(code.contains("msg.quad[0] = draw(ros_int32(min_value=1, max_value=9))"));
    assert!(code.contains("msg.quad[1] = draw(ros_int32())"));
    Ok(())
}

#[test]
fn broadcasts_constrain_every_element() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let tree = registry.make_custom("g", "pkg/Arrays")?;
    tree.field_mut(&[PathStep::field("quad")])?.gt(0i64)?;
    registry.complete_custom_strategies();
    let code = registry.render_custom("g", "pkg/Arrays", &RenderConfig::default())?;
    for i in 0..4 {
        assert!(code.contains(&format!("msg.quad[{i}] = draw(ros_int32(min_value=0))")));
        assert!(code.contains(&format!("assume(msg.quad[{i}] > 0)")));
    }
    Ok(())
}

#[test]
fn indexing_out_of_bounds_is_reported() {
    let mut registry = StrategyMap::new(table());
    let tree = registry.make_custom("g", "pkg/Arrays").unwrap();
    assert!(matches!(
        tree.field_mut(&[PathStep::field("quad"), PathStep::index(4)]),
        Err(Error::InvalidSelector(_))
    ));
}

// ============================================================================
// Variable-length arrays
// ============================================================================

#[test]
fn template_constraints_inline_in_the_loop_body() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    let tree = registry.make_custom("g", "pkg/Arrays")?;
    tree.field_mut(&[PathStep::field("readings")])?.gt(0.0)?;
    registry.complete_custom_strategies();
    let code = registry.render_custom("g", "pkg/Arrays", &RenderConfig::default())?;
    let block = concat!(
        "    msg.readings = draw(strategies.lists(min_size=0, max_size=256))\n",
        "    for i in range(len(msg.readings)):\n",
        "        msg.readings[i] = draw(ros_float64(min_value=0.0))\n",
        "        assume(msg.readings[i] > 0.0)"
    );
    assert!(code.contains(block), "missing block in:\n{code}");
    Ok(())
}

#[test]
fn any_index_is_unsupported_on_variable_length_arrays() {
    let mut registry = StrategyMap::new(table());
    let tree = registry.make_custom("g", "pkg/Arrays").unwrap();
    assert!(matches!(
        tree.field_mut(&[PathStep::field("tags"), PathStep::any()]),
        Err(Error::UnsupportedOperation { .. })
    ));
    assert!(matches!(
        tree.field_mut(&[PathStep::field("tags"), PathStep::index(0)]),
        Err(Error::UnsupportedOperation { .. })
    ));
}

#[test]
fn length_cap_is_configurable() -> anyhow::Result<()> {
    let mut registry = StrategyMap::new(table());
    registry.make_custom("g", "pkg/Arrays")?;
    registry.complete_custom_strategies();
    let cfg = RenderConfig {
        max_array_len: 8,
        ..RenderConfig::default()
    };
    let code = registry.render_custom("g", "pkg/Arrays", &cfg)?;
    assert!(code.contains("msg.readings = draw(strategies.lists(min_size=0, max_size=8))"));
    Ok(())
}
