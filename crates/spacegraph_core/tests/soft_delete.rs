use rusqlite::Connection;
use spacegraph_core::db::open_db_in_memory;
use spacegraph_core::{
    AdminError, AdminService, NodeService, Principal, Scope, SqliteNodeRepository,
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

#[test]
fn remove_is_idempotent_and_scoped() {
    let conn = setup();
    let admin = admin(&conn);
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();

    let node = admin.create_node("Orphan", None).unwrap();
    admin.remove_node(node.public_id).unwrap();
    // Second removal is a no-op, not an error.
    admin.remove_node(node.public_id).unwrap();

    use spacegraph_core::NodeRepository;
    assert!(repo.get_node(node.public_id, Scope::Active).unwrap().is_none());
    let tombstoned = repo.get_node(node.public_id, Scope::All).unwrap().unwrap();
    assert!(tombstoned.is_removed);
}

#[test]
fn removing_an_unknown_node_errors() {
    let conn = setup();
    let admin = admin(&conn);

    let missing = Uuid::new_v4();
    let err = admin.remove_node(missing).unwrap_err();
    assert!(matches!(err, AdminError::NodeNotFound(id) if id == missing));
}

#[test]
fn removed_child_disappears_from_parent_subnodes_without_unlink() {
    let conn = setup();
    let admin = admin(&conn);
    let service = facade(&conn);

    let owner = Uuid::new_v4();
    let space = admin.create_space("Workspace", Some(owner)).unwrap();
    let parent = admin.create_node("Parent", Some(space.public_id)).unwrap();
    let child = admin.create_node("Child", Some(space.public_id)).unwrap();
    admin.link_subnode(parent.public_id, child.public_id).unwrap();

    let principal = Principal::User(owner);
    let detail = service
        .get_node(&principal, &parent.public_id.to_string(), false)
        .unwrap();
    assert_eq!(detail.subnodes.len(), 1);

    admin.remove_node(child.public_id).unwrap();

    // The adjacency row still exists; visibility resolution hides it.
    let links: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM node_subnodes WHERE parent_uuid = ?1;",
            [parent.public_id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(links, 1);

    let detail = service
        .get_node(&principal, &parent.public_id.to_string(), false)
        .unwrap();
    assert!(detail.subnodes.is_empty());

    let listing = service.list_nodes(&principal, &Default::default()).unwrap();
    let parent_row = listing
        .items
        .iter()
        .find(|item| item.public_id == parent.public_id)
        .unwrap();
    assert!(!parent_row.has_subnodes);
}

#[test]
fn bulk_space_removal_reports_affected_nodes() {
    let conn = setup();
    let admin = admin(&conn);
    let service = facade(&conn);

    let owner = Uuid::new_v4();
    let doomed = admin.create_space("Doomed", Some(owner)).unwrap();
    let kept = admin.create_space("Kept", Some(owner)).unwrap();
    for index in 0..3 {
        admin
            .create_node(format!("doomed-{index}"), Some(doomed.public_id))
            .unwrap();
    }
    let survivor = admin.create_node("survivor", Some(kept.public_id)).unwrap();

    let affected = admin.remove_space_nodes(doomed.public_id).unwrap();
    assert_eq!(affected, 3);
    // Repeating the bulk removal matches nothing further.
    assert_eq!(admin.remove_space_nodes(doomed.public_id).unwrap(), 0);

    let listing = service
        .list_nodes(&Principal::User(owner), &Default::default())
        .unwrap();
    assert_eq!(listing.count, 1);
    assert_eq!(listing.items[0].public_id, survivor.public_id);
}

#[test]
fn hard_remove_deletes_row_and_references() {
    let conn = setup();
    let admin = admin(&conn);

    let owner = Uuid::new_v4();
    let space = admin.create_space("Workspace", Some(owner)).unwrap();
    let parent = admin.create_node("Parent", Some(space.public_id)).unwrap();
    let child = admin.create_node("Child", Some(space.public_id)).unwrap();
    admin.link_subnode(parent.public_id, child.public_id).unwrap();
    admin
        .set_graph_document(child.public_id, r#"{"nodes": {}, "edges": {}}"#)
        .unwrap();

    admin.hard_remove_node(child.public_id).unwrap();

    use spacegraph_core::NodeRepository;
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    assert!(repo.get_node(child.public_id, Scope::All).unwrap().is_none());

    let links: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM node_subnodes WHERE parent_uuid = ?1 OR child_uuid = ?1;",
            [child.public_id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(links, 0);

    let docs: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM graph_documents WHERE public_id = ?1;",
            [child.public_id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(docs, 0);
}
