use actionkit_core::{
    compile_str, ActionDomain, CompileOptions, ComposeError, ExtensionRecord, LayoutKind,
    LayoutTree,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn record(text: &str) -> ExtensionRecord {
    compile_str(text, &CompileOptions::new("test.xml")).expect("valid descriptor")
}

const FILE_MENU: &str = r#"<actionExtension><layouts>
    <menuBar id="mainMenu">
        <menu id="file"><action id="open"/><action id="quit"/></menu>
    </menuBar>
</layouts></actionExtension>"#;

fn domain_with(descriptors: &[&str]) -> ActionDomain {
    let mut domain = ActionDomain::new();
    for text in descriptors {
        domain.add_extension(record(text)).expect("registration");
    }
    domain
}

fn file_children(domain: &ActionDomain) -> Vec<Option<String>> {
    let layouts = domain.layouts();
    let file = layouts.find("file").expect("file menu composed");
    layouts
        .tree(file)
        .expect("file tree")
        .children
        .into_iter()
        .map(|child| child.id)
        .collect()
}

fn ids(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|value| Some(value.to_string())).collect()
}

#[test]
fn after_anchor_inserts_next_to_sibling() {
    let domain = domain_with(&[
        r#"<actionExtension><layouts><menu id="file"><action id="open"/></menu></layouts></actionExtension>"#,
        r#"<actionExtension><buildRoutines>
            <buildRoutine parent="file" anchor="after" relativeTo="open"><action id="save"/></buildRoutine>
        </buildRoutines></actionExtension>"#,
    ]);

    assert_eq!(file_children(&domain), ids(&["open", "save"]));
    assert_eq!(domain.last_layout_error(), None);
}

#[test]
fn missing_anchor_sibling_is_skipped() {
    let domain = domain_with(&[
        FILE_MENU,
        r#"<actionExtension><buildRoutines>
            <buildRoutine parent="file" anchor="before" relativeTo="missing"><action id="save"/></buildRoutine>
            <buildRoutine parent="file" anchor="last"><action id="close"/></buildRoutine>
        </buildRoutines></actionExtension>"#,
    ]);

    assert_eq!(file_children(&domain), ids(&["open", "quit", "close"]));
    assert_eq!(domain.last_layout_error(), None);
}

#[test]
fn routines_apply_in_registration_order() {
    let domain = domain_with(&[
        FILE_MENU,
        r#"<actionExtension><buildRoutines>
            <buildRoutine parent="file" anchor="first"><action id="new"/></buildRoutine>
            <buildRoutine parent="file" anchor="before" relativeTo="quit"><action id="save"/><separator/></buildRoutine>
        </buildRoutines></actionExtension>"#,
        r#"<actionExtension>
            <layouts><menu id="help"><action id="about"/></menu></layouts>
            <buildRoutines>
                <buildRoutine parent="file" anchor="after" relativeTo="save"><action id="saveAs"/></buildRoutine>
                <buildRoutine parent="mainMenu" anchor="last"><menu id="help"/></buildRoutine>
            </buildRoutines>
        </actionExtension>"#,
    ]);

    let children = file_children(&domain);
    assert_eq!(
        children,
        vec![
            Some("new".to_string()),
            Some("open".to_string()),
            Some("save".to_string()),
            Some("saveAs".to_string()),
            None,
            Some("quit".to_string()),
        ]
    );

    let layouts = domain.layouts();
    assert_eq!(layouts.root_ids(), vec!["help", "mainMenu"]);
    let main = layouts
        .tree(layouts.find("mainMenu").expect("main menu"))
        .expect("main menu tree");
    assert_eq!(main.child_ids(), vec![Some("file"), Some("help")]);
    assert_eq!(main.children[1].child_ids(), vec![Some("about")]);
    assert_eq!(layouts.occurrences("help").len(), 1);
}

#[test]
fn standalone_nodes_are_shared() {
    let domain = domain_with(&[r#"<actionExtension><layouts>
        <menuBar id="mainMenu"><menu id="file"><action id="open"/></menu></menuBar>
        <toolBar id="mainToolBar"><menu id="file"/><stretch/><separator/></toolBar>
    </layouts></actionExtension>"#]);

    let layouts = domain.layouts();
    assert_eq!(layouts.root_ids(), vec!["mainMenu", "mainToolBar"]);
    let file = layouts.find("file").expect("file");
    assert_eq!(layouts.occurrences("file"), &[file]);

    let main = layouts.node(layouts.roots()[0]).expect("main menu");
    let tool = layouts.node(layouts.roots()[1]).expect("tool bar");
    assert_eq!(main.children()[0].node, file);
    assert_eq!(tool.children()[0].node, file);
    assert_eq!(
        tool.children()[1..]
            .iter()
            .map(|child| child.kind)
            .collect::<Vec<_>>(),
        vec![LayoutKind::Stretch, LayoutKind::Separator]
    );
}

#[test]
fn flat_reference_expands_only_at_its_own_site() {
    let domain = domain_with(&[r#"<actionExtension><layouts>
        <menuBar id="main"><menu id="file"><action id="open"/></menu></menuBar>
        <toolBar id="tb"><menu id="file" flat="true"/></toolBar>
    </layouts></actionExtension>"#]);

    let layouts = domain.layouts();
    let file = layouts.find("file").expect("file");
    assert_eq!(layouts.occurrences("file"), &[file]);

    let trees = layouts.to_trees();
    let main = trees.iter().find(|tree| tree.id.as_deref() == Some("main")).expect("main");
    let tb = trees.iter().find(|tree| tree.id.as_deref() == Some("tb")).expect("tb");
    assert_eq!(main.children[0].kind, LayoutKind::Menu);
    assert_eq!(tb.children[0].kind, LayoutKind::ExpandedMenu);
    assert_eq!(tb.children[0].child_ids(), vec![Some("open")]);
    assert_eq!(layouts.tree(file).expect("file tree").kind, LayoutKind::Menu);
}

#[test]
fn composition_is_idempotent_and_deterministic() {
    let descriptors = [
        FILE_MENU,
        r#"<actionExtension><buildRoutines>
            <buildRoutine parent="file" anchor="after" relativeTo="open"><action id="save"/></buildRoutine>
        </buildRoutines></actionExtension>"#,
    ];
    let mut domain = domain_with(&descriptors);

    let first = domain.layouts();
    let second = domain.layouts();
    assert!(Arc::ptr_eq(&first, &second));

    domain.reset_layouts();
    let rebuilt = domain.layouts();
    assert!(!Arc::ptr_eq(&first, &rebuilt));
    assert_eq!(rebuilt.to_trees(), first.to_trees());

    let other = domain_with(&descriptors);
    assert_eq!(other.layouts().to_trees(), first.to_trees());
}

#[test]
fn mutually_nested_menus_empty_the_layouts() {
    let domain = domain_with(&[r#"<actionExtension>
        <layouts><menu id="a"><menu id="b"/></menu></layouts>
        <buildRoutines>
            <buildRoutine parent="b" anchor="last"><menu id="a"/></buildRoutine>
        </buildRoutines>
    </actionExtension>"#]);

    assert!(domain.layouts().is_empty());
    let Some(ComposeError::CycleInStandaloneGraph { mut ids }) = domain.last_layout_error() else {
        panic!("expected a cycle error");
    };
    ids.sort();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn consumer_layouts_replace_composition_until_registry_changes() {
    let mut domain = domain_with(&[FILE_MENU]);

    let custom = vec![LayoutTree::new(LayoutKind::Menu, "mainMenu").with_children(vec![
        LayoutTree::new(LayoutKind::Menu, "file").with_children(vec![
            LayoutTree::new(LayoutKind::Action, "quit"),
            LayoutTree::separator(),
            LayoutTree::new(LayoutKind::Action, "ghost"),
            LayoutTree::new(LayoutKind::Action, "open"),
        ]),
    ])];
    domain.set_layouts(&custom).expect("valid layouts");
    assert_eq!(
        file_children(&domain),
        vec![Some("quit".to_string()), None, Some("open".to_string())]
    );

    domain
        .add_extension(record(
            r#"<actionExtension><objects><action id="extra"/></objects></actionExtension>"#,
        ))
        .expect("registration");
    assert_eq!(file_children(&domain), ids(&["open", "quit"]));
}

#[test]
fn cyclic_consumer_layouts_are_rejected() {
    let mut domain = domain_with(&[FILE_MENU]);

    let cyclic = vec![LayoutTree::new(LayoutKind::Menu, "file")
        .with_children(vec![LayoutTree::new(LayoutKind::Menu, "mainMenu")
            .with_children(vec![LayoutTree::new(LayoutKind::Menu, "file")])])];
    let err = domain.set_layouts(&cyclic).expect_err("cycle");

    assert!(matches!(err, ComposeError::CycleInStandaloneGraph { .. }));
    assert!(domain.layouts().is_empty());
    assert_eq!(domain.last_layout_error(), Some(err));

    domain.reset_layouts();
    assert_eq!(domain.layouts().root_ids(), vec!["mainMenu"]);
}
