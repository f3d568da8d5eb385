use super::*;
use crate::foundation::core::Vec3;

fn cube() -> Arc<Mesh> {
    Arc::new(Mesh::cube(1.0))
}

#[test]
fn world_transform_composes_parent_chain() {
    let mut scene = SceneGraph::default();
    let root = scene
        .add(Node::group(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))))
        .unwrap();
    let child = scene
        .add(
            Node::drawable(
                cube(),
                Material::default(),
                Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)),
            )
            .with_parent(root),
        )
        .unwrap();

    let world = scene.world_transform(child).unwrap();
    assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 0.0));
}

#[test]
fn visit_skips_groups_and_hidden_subtrees() {
    let mut scene = SceneGraph::default();
    let group = scene.add(Node::group(Mat4::IDENTITY)).unwrap();
    let a = scene
        .add(Node::drawable(cube(), Material::default(), Mat4::IDENTITY).with_parent(group))
        .unwrap();
    let b = scene
        .add(Node::drawable(cube(), Material::default(), Mat4::IDENTITY))
        .unwrap();

    let mut seen = Vec::new();
    scene.visit(&mut |item| seen.push(item.id));
    assert_eq!(seen, vec![a, b]);

    scene.node_mut(group).unwrap().visible = false;
    seen.clear();
    scene.visit(&mut |item| seen.push(item.id));
    assert_eq!(seen, vec![b]);
}

#[test]
fn membership_generation_tracks_add_and_remove_only() {
    let mut scene = SceneGraph::default();
    let g0 = scene.membership_generation();
    let id = scene
        .add(Node::drawable(cube(), Material::default(), Mat4::IDENTITY))
        .unwrap();
    let g1 = scene.membership_generation();
    assert!(g1 > g0);

    scene.set_local(id, Mat4::from_scale(Vec3::splat(2.0))).unwrap();
    assert_eq!(scene.membership_generation(), g1);

    assert_eq!(scene.remove(id), 1);
    assert!(scene.membership_generation() > g1);
    assert!(!scene.contains(id));
}

#[test]
fn remove_takes_descendants_and_ids_are_not_reused() {
    let mut scene = SceneGraph::default();
    let root = scene.add(Node::group(Mat4::IDENTITY)).unwrap();
    let child = scene
        .add(Node::drawable(cube(), Material::default(), Mat4::IDENTITY).with_parent(root))
        .unwrap();
    assert_eq!(scene.remove(root), 2);
    assert!(scene.is_empty());

    let fresh = scene.add(Node::group(Mat4::IDENTITY)).unwrap();
    assert_ne!(fresh, root);
    assert_ne!(fresh, child);
}

#[test]
fn add_rejects_unknown_parent() {
    let mut scene = SceneGraph::default();
    let err = scene
        .add(Node::group(Mat4::IDENTITY).with_parent(ObjectId(42)))
        .unwrap_err();
    assert!(err.to_string().contains("not in the scene"));
}
