use actionkit_core::compiler::xml::parse_document;
use actionkit_core::{
    compile_str, ActionDomain, CompileOptions, ComposeError, ExtensionRecord, LayoutKind,
    LayoutTree, RestoreError, SaveError,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const BASE: &str = r#"<actionExtension><layouts>
    <menuBar id="mainMenu">
        <menu id="file"><action id="open"/><action id="quit"/></menu>
    </menuBar>
    <toolBar id="mainToolBar"><menu id="file"/><stretch/></toolBar>
</layouts></actionExtension>"#;

const SAVE_ROUTINE: &str = r#"<actionExtension><buildRoutines>
    <buildRoutine parent="file" anchor="after" relativeTo="open"><action id="save"/></buildRoutine>
</buildRoutines></actionExtension>"#;

const CLOSE_ROUTINE: &str = r#"<actionExtension><buildRoutines>
    <buildRoutine parent="file" anchor="last"><separator/><action id="close"/></buildRoutine>
</buildRoutines></actionExtension>"#;

fn record(text: &str) -> ExtensionRecord {
    compile_str(text, &CompileOptions::new("test.xml")).expect("valid descriptor")
}

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
fn saved_layouts_restore_into_a_fresh_domain() {
    let domain = domain_with(&[BASE, SAVE_ROUTINE]);
    let saved = domain.save_layouts().expect("save");

    let document = parse_document(&saved).expect("saved xml");
    assert_eq!(document.name, "actionDomain");
    let hashes: Vec<&str> = document.children[0]
        .children
        .iter()
        .map(|extension| extension.attr("hash"))
        .collect();
    let expected: Vec<String> = domain
        .extensions()
        .map(|record| record.hash().to_string())
        .collect();
    assert_eq!(hashes, expected);

    let mut restored = domain_with(&[BASE, SAVE_ROUTINE]);
    restored.restore_layouts(&saved).expect("restore");
    assert_eq!(restored.layouts().to_trees(), domain.layouts().to_trees());
    assert_eq!(file_children(&restored), ids(&["open", "save", "quit"]));
    assert_eq!(restored.last_layout_error(), None);

    let layouts = restored.layouts();
    assert_eq!(layouts.occurrences("file").len(), 1);
}

#[test]
fn customization_survives_new_extension() {
    let mut domain = domain_with(&[BASE, SAVE_ROUTINE]);
    let custom = vec![LayoutTree::new(LayoutKind::Menu, "mainMenu").with_children(vec![
        LayoutTree::new(LayoutKind::Menu, "file").with_children(vec![
            LayoutTree::new(LayoutKind::Action, "quit"),
            LayoutTree::new(LayoutKind::Action, "save"),
            LayoutTree::new(LayoutKind::Action, "open"),
        ]),
    ])];
    domain.set_layouts(&custom).expect("valid layouts");
    let saved = domain.save_layouts().expect("save");

    let mut upgraded = domain_with(&[BASE, SAVE_ROUTINE, CLOSE_ROUTINE]);
    upgraded.restore_layouts(&saved).expect("restore");

    let children = file_children(&upgraded);
    assert_eq!(
        children,
        vec![
            Some("quit".to_string()),
            Some("save".to_string()),
            Some("open".to_string()),
            None,
            Some("close".to_string()),
        ]
    );
    assert_eq!(upgraded.layouts().root_ids(), vec!["mainMenu"]);

    let close = upgraded
        .extensions()
        .last()
        .map(|record| record.hash().to_string())
        .expect("close extension");
    upgraded.remove_extension(&close).expect("registered");
    assert_eq!(file_children(&upgraded), ids(&["open", "save", "quit"]));
}

#[test]
fn unreadable_data_keeps_current_layouts() {
    let mut domain = domain_with(&[BASE]);
    let before = domain.layouts();

    let err = domain
        .restore_layouts(b"<actionDomain><layouts>")
        .expect_err("unclosed document");
    assert!(matches!(err, RestoreError::Xml(_)));
    assert!(Arc::ptr_eq(&before, &domain.layouts()));

    let err = domain
        .restore_layouts(b"<actionExtension/>")
        .expect_err("foreign root");
    assert_eq!(err, RestoreError::UnknownRootTag("actionExtension".to_string()));
    assert!(Arc::ptr_eq(&before, &domain.layouts()));
}

#[test]
fn cyclic_saved_layouts_leave_empty_layouts() {
    let mut domain = domain_with(&[BASE]);

    let err = domain
        .restore_layouts(
            br#"<actionDomain><layouts>
                <menu id="file"><menu id="mainMenu"><menu id="file"/></menu></menu>
            </layouts></actionDomain>"#,
        )
        .expect_err("cycle");

    assert!(matches!(
        err,
        RestoreError::Compose(ComposeError::CycleInStandaloneGraph { .. })
    ));
    assert!(domain.layouts().is_empty());
    assert!(domain.last_layout_error().is_some());
}

#[test]
fn failed_composition_is_not_saved() {
    let mut domain = domain_with(&[BASE]);
    domain
        .restore_layouts(
            br#"<actionDomain><layouts>
                <menu id="file"><menu id="mainMenu"><menu id="file"/></menu></menu>
            </layouts></actionDomain>"#,
        )
        .expect_err("cycle");

    let err = domain.save_layouts().expect_err("no layouts to save");
    assert!(matches!(
        err,
        SaveError::Unavailable(ComposeError::CycleInStandaloneGraph { .. })
    ));

    domain.reset_layouts();
    assert!(domain.save_layouts().is_ok());
}

#[test]
fn flat_and_nested_references_round_trip() {
    let domain = domain_with(&[r#"<actionExtension><layouts>
        <menuBar id="main"><menu id="file"><action id="open"/></menu></menuBar>
        <toolBar id="tb"><menu id="file" flat="true"/></toolBar>
    </layouts></actionExtension>"#]);
    let saved = domain.save_layouts().expect("save");

    let document = parse_document(&saved).expect("saved xml");
    let tb = document.children[1]
        .children
        .iter()
        .find(|root| root.attr("id") == "tb")
        .expect("tb saved");
    assert_eq!(tb.children[0].attr("flat"), "true");

    let mut restored = domain_with(&[r#"<actionExtension><layouts>
        <menuBar id="main"><menu id="file"><action id="open"/></menu></menuBar>
        <toolBar id="tb"><menu id="file" flat="true"/></toolBar>
    </layouts></actionExtension>"#]);
    restored.restore_layouts(&saved).expect("restore");
    let trees = restored.layouts().to_trees();
    assert_eq!(trees, domain.layouts().to_trees());

    let kind_under = |root: &str| {
        trees
            .iter()
            .find(|tree| tree.id.as_deref() == Some(root))
            .map(|tree| tree.children[0].kind)
    };
    assert_eq!(kind_under("main"), Some(LayoutKind::Menu));
    assert_eq!(kind_under("tb"), Some(LayoutKind::ExpandedMenu));
}

#[test]
fn invalid_saved_roots_are_dropped() {
    let mut domain = domain_with(&[BASE]);
    let hash = domain
        .extensions()
        .next()
        .map(|record| record.hash().to_string())
        .expect("base extension");

    let saved = format!(
        r#"<actionDomain>
            <extensions><extension hash="{hash}"/></extensions>
            <layouts>
                <action id="open"/>
                <menu id="ghost"/>
                <group id="file"/>
                <button id="mainToolBar"/>
                <menu id="mainMenu"><menu id="file"><action id="quit"/><menu id="open"/></menu></menu>
            </layouts>
        </actionDomain>"#
    );
    domain.restore_layouts(saved.as_bytes()).expect("restore");

    assert_eq!(domain.layouts().root_ids(), vec!["mainMenu"]);
    assert_eq!(file_children(&domain), ids(&["quit"]));
}
