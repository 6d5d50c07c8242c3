use rusqlite::Connection;
use spacegraph_core::db::open_db_in_memory;
use spacegraph_core::{
    Action, AdminService, NodeQuery, NodeService, Principal, ServiceError, SqliteNodeRepository,
    SqliteSpaceRepository,
};
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn admin(conn: &Connection) -> AdminService<SqliteSpaceRepository<'_>, SqliteNodeRepository<'_>> {
    AdminService::new(
        SqliteSpaceRepository::try_new(conn).unwrap(),
        SqliteNodeRepository::try_new(conn).unwrap(),
    )
}

fn facade(conn: &Connection) -> NodeService<SqliteNodeRepository<'_>> {
    NodeService::new(SqliteNodeRepository::try_new(conn).unwrap())
}

fn space_query(space: Uuid) -> NodeQuery {
    NodeQuery {
        space: Some(space.to_string()),
    }
}

#[test]
fn owner_lists_nodes_of_own_space_in_creation_order() {
    let conn = setup();
    let admin = admin(&conn);
    let service = facade(&conn);

    let owner = Uuid::new_v4();
    let space = admin.create_space("Workspace", Some(owner)).unwrap();

    let listing = service
        .list_nodes(&Principal::User(owner), &Default::default())
        .unwrap();
    assert_eq!(listing.count, 0);

    let mut created = Vec::new();
    for index in 0..10 {
        created.push(
            admin
                .create_node(format!("node-{index}"), Some(space.public_id))
                .unwrap(),
        );
    }

    let listing = service
        .list_nodes(&Principal::User(owner), &Default::default())
        .unwrap();
    assert_eq!(listing.count, 10);
    for (item, node) in listing.items.iter().zip(&created) {
        assert_eq!(item.public_id, node.public_id);
        assert!(!item.has_subnodes);
    }
}

#[test]
fn anonymous_principal_sees_nothing() {
    let conn = setup();
    let admin = admin(&conn);
    let service = facade(&conn);

    let owner = Uuid::new_v4();
    let space = admin.create_space("Workspace", Some(owner)).unwrap();
    let node = admin.create_node("Visible", Some(space.public_id)).unwrap();

    let listing = service
        .list_nodes(&Principal::Anonymous, &Default::default())
        .unwrap();
    assert_eq!(listing.count, 0);

    let err = service
        .get_node(&Principal::Anonymous, &node.public_id.to_string(), false)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[test]
fn unscoped_node_is_hidden_until_exposed_via_membership() {
    let conn = setup();
    let admin = admin(&conn);
    let service = facade(&conn);

    let viewer = Uuid::new_v4();
    let node = admin.create_node("Floating", None).unwrap();
    let principal = Principal::User(viewer);

    let listing = service.list_nodes(&principal, &Default::default()).unwrap();
    assert_eq!(listing.count, 0);

    // Exists but no space grants access: denied, not absent.
    let err = service
        .get_node(&principal, &node.public_id.to_string(), false)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(id) if id == node.public_id));

    // Expose the pre-existing node into a space the viewer can read.
    let space = admin.create_space("Shared", Some(Uuid::new_v4())).unwrap();
    admin.grant_viewer(space.public_id, viewer).unwrap();
    admin.expose_node(space.public_id, node.public_id).unwrap();

    let listing = service
        .list_nodes(&principal, &space_query(space.public_id))
        .unwrap();
    assert_eq!(listing.count, 1);
    assert_eq!(listing.items[0].public_id, node.public_id);

    let detail = service
        .get_node(&principal, &node.public_id.to_string(), false)
        .unwrap();
    assert_eq!(detail.public_id, node.public_id);
}

#[test]
fn space_filter_narrows_and_never_forbids() {
    let conn = setup();
    let admin = admin(&conn);
    let service = facade(&conn);

    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let space = admin.create_space("Mine", Some(owner)).unwrap();
    let other_space = admin.create_space("Mine too", Some(owner)).unwrap();
    let node = admin.create_node("Scoped", Some(space.public_id)).unwrap();

    let listing = service
        .list_nodes(&Principal::User(owner), &space_query(space.public_id))
        .unwrap();
    assert_eq!(listing.count, 1);
    assert_eq!(listing.items[0].public_id, node.public_id);

    let listing = service
        .list_nodes(&Principal::User(owner), &space_query(other_space.public_id))
        .unwrap();
    assert_eq!(listing.count, 0);

    // A space the caller cannot see narrows to zero rows instead of failing.
    let listing = service
        .list_nodes(&Principal::User(stranger), &space_query(space.public_id))
        .unwrap();
    assert_eq!(listing.count, 0);
}

#[test]
fn filtering_by_an_invisible_space_discloses_nothing() {
    let conn = setup();
    let admin = admin(&conn);
    let service = facade(&conn);

    let owner = Uuid::new_v4();
    let mine = admin.create_space("Mine", Some(owner)).unwrap();
    let foreign = admin.create_space("Foreign", Some(Uuid::new_v4())).unwrap();
    let node = admin.create_node("Lent", Some(foreign.public_id)).unwrap();
    admin.expose_node(mine.public_id, node.public_id).unwrap();

    let principal = Principal::User(owner);

    // The membership grant makes the node reachable through the caller's
    // own space.
    let listing = service
        .list_nodes(&principal, &space_query(mine.public_id))
        .unwrap();
    assert_eq!(listing.count, 1);
    assert_eq!(listing.items[0].public_id, node.public_id);

    // Narrowing to the foreign space must not reveal that the node is
    // owned by it.
    let listing = service
        .list_nodes(&principal, &space_query(foreign.public_id))
        .unwrap();
    assert_eq!(listing.count, 0);
}

#[test]
fn removed_space_cascades_over_every_grant() {
    let conn = setup();
    let admin = admin(&conn);
    let service = facade(&conn);

    let owner = Uuid::new_v4();
    let space = admin.create_space("Workspace", Some(owner)).unwrap();
    let node = admin.create_node("Scoped", Some(space.public_id)).unwrap();
    let principal = Principal::User(owner);

    admin.remove_space(space.public_id).unwrap();

    let listing = service.list_nodes(&principal, &Default::default()).unwrap();
    assert_eq!(listing.count, 0);

    // The node itself survives, so retrieval is denied rather than absent.
    let err = service
        .get_node(&principal, &node.public_id.to_string(), false)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(id) if id == node.public_id));
}

#[test]
fn removed_node_is_not_found_even_for_its_owner() {
    let conn = setup();
    let admin = admin(&conn);
    let service = facade(&conn);

    let owner = Uuid::new_v4();
    let space = admin.create_space("Workspace", Some(owner)).unwrap();
    let node = admin.create_node("Scoped", Some(space.public_id)).unwrap();
    admin.remove_node(node.public_id).unwrap();

    let err = service
        .get_node(&Principal::User(owner), &node.public_id.to_string(), false)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(id) if id == node.public_id));
}

#[test]
fn allowed_actions_follow_role_capabilities() {
    let conn = setup();
    let admin = admin(&conn);
    let service = facade(&conn);

    let owner = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let space = admin.create_space("Workspace", Some(owner)).unwrap();
    admin.grant_viewer(space.public_id, viewer).unwrap();
    let node = admin.create_node("Scoped", Some(space.public_id)).unwrap();

    let detail = service
        .get_node(&Principal::User(owner), &node.public_id.to_string(), true)
        .unwrap();
    assert_eq!(
        detail.allowed_actions,
        Some(vec![Action::Read, Action::Write, Action::Manage, Action::Delete])
    );

    let detail = service
        .get_node(&Principal::User(viewer), &node.public_id.to_string(), true)
        .unwrap();
    assert_eq!(detail.allowed_actions, Some(vec![Action::Read]));

    let detail = service
        .get_node(&Principal::User(viewer), &node.public_id.to_string(), false)
        .unwrap();
    assert!(detail.allowed_actions.is_none());
}

#[test]
fn subnode_listing_is_shallow_with_one_level_lookahead() {
    let conn = setup();
    let admin = admin(&conn);
    let service = facade(&conn);

    let owner = Uuid::new_v4();
    let space = admin.create_space("Workspace", Some(owner)).unwrap();
    let node = admin.create_node("Top", Some(space.public_id)).unwrap();
    let node_2 = admin.create_node("Middle", Some(space.public_id)).unwrap();
    let node_3 = admin.create_node("Leaf", Some(space.public_id)).unwrap();
    admin.link_subnode(node.public_id, node_2.public_id).unwrap();
    admin.link_subnode(node_2.public_id, node_3.public_id).unwrap();

    let principal = Principal::User(owner);
    let detail = service
        .get_node(&principal, &node.public_id.to_string(), false)
        .unwrap();
    assert_eq!(detail.subnodes.len(), 1);
    assert_eq!(detail.subnodes[0].public_id, node_2.public_id);
    assert!(detail.subnodes[0].has_subnodes);

    let detail = service
        .get_node(&principal, &node_3.public_id.to_string(), false)
        .unwrap();
    assert!(detail.subnodes.is_empty());

    let listing = service.list_nodes(&principal, &Default::default()).unwrap();
    let leaf = listing
        .items
        .iter()
        .find(|item| item.public_id == node_3.public_id)
        .unwrap();
    assert!(!leaf.has_subnodes);
}

#[test]
fn space_listing_applies_the_same_role_predicate() {
    use spacegraph_core::{space_visibility_filter, SpaceRepository};

    let conn = setup();
    let admin = admin(&conn);
    let spaces = SqliteSpaceRepository::try_new(&conn).unwrap();

    let owner = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let owned = admin.create_space("Owned", Some(owner)).unwrap();
    let shared = admin.create_space("Shared", Some(Uuid::new_v4())).unwrap();
    admin.grant_viewer(shared.public_id, viewer).unwrap();
    let removed = admin.create_space("Removed", Some(owner)).unwrap();
    admin.remove_space(removed.public_id).unwrap();

    let visible = spaces
        .list_visible(&space_visibility_filter(
            &Principal::User(owner),
            Action::Read,
            "sp",
        ))
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].public_id, owned.public_id);

    let visible = spaces
        .list_visible(&space_visibility_filter(
            &Principal::User(viewer),
            Action::Read,
            "sp",
        ))
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].public_id, shared.public_id);

    // Viewers are read-only: the write predicate matches nothing for them.
    let visible = spaces
        .list_visible(&space_visibility_filter(
            &Principal::User(viewer),
            Action::Write,
            "sp",
        ))
        .unwrap();
    assert!(visible.is_empty());

    let visible = spaces
        .list_visible(&space_visibility_filter(
            &Principal::Anonymous,
            Action::Read,
            "sp",
        ))
        .unwrap();
    assert!(visible.is_empty());
}

#[test]
fn malformed_identifiers_are_validation_errors() {
    let conn = setup();
    let service = facade(&conn);
    let principal = Principal::User(Uuid::new_v4());

    let err = service.get_node(&principal, "not-a-uuid", false).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let query = NodeQuery {
        space: Some("also-not-a-uuid".to_string()),
    };
    let err = service.list_nodes(&principal, &query).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}
