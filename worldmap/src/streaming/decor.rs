//! Décor attachments and the draw distance policy.

use tracing::warn;

use crate::coord::{WorldBounds, WorldPoint, ZoneTileKey};
use crate::engine::{DecorScene, DrawDistance, InstanceGroup};

/// Group placed at every outpost anchor of a zone.
pub const RUINS_GROUP: &str = "gen_bt_ruines.ig";

/// Zone group instances whose position anchors outpost buildings.
pub const OUTPOST_ANCHOR_PREFIX: &str = "bat_zc_";

/// Marker in instance names of vegetation.
const VEGETATION_MARKER: &str = ".plant";

/// Coarse mesh distance for visible instances.
const COARSE_MESH_DISTANCE: f64 = 100000.0;

/// What an attachment's lifetime is tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentScope {
    /// Lives as long as the continent (villages).
    Continent,
    /// Lives while the tile is loaded (outpost ruins).
    Tile(ZoneTileKey),
}

/// A named décor group bound to a continent or a tile.
///
/// The binding outlives the materialized groups: a tile attachment is
/// materialized when its tile loads and destroyed when it unloads.
pub struct DecorAttachment {
    pub name: String,
    pub parent: String,
    pub scope: AttachmentScope,
    groups: Vec<Box<dyn InstanceGroup>>,
}

impl DecorAttachment {
    pub fn new(name: impl Into<String>, parent: impl Into<String>, scope: AttachmentScope) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
            scope,
            groups: Vec::new(),
        }
    }

    /// Whether any group of this attachment is in the scene.
    pub fn is_materialized(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Number of groups in the scene.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Load the group and add it to the scene where its file places it.
    pub fn materialize(&mut self, scene: &mut dyn DecorScene, hide_vegetation: bool) {
        match scene.instantiate(&self.name) {
            Ok(mut group) => {
                scene.add_to_scene(group.as_mut());
                apply_distance_policy(group.as_mut(), hide_vegetation);
                self.groups.push(group);
            }
            Err(e) => warn!(group = %self.name, error = %e, "Instance group not found"),
        }
    }

    /// Load one copy of the group per anchor position.
    pub fn materialize_at(
        &mut self,
        scene: &mut dyn DecorScene,
        anchors: &[WorldPoint],
        hide_vegetation: bool,
    ) {
        for anchor in anchors {
            match scene.instantiate(&self.name) {
                Ok(mut group) => {
                    group.set_position(*anchor);
                    scene.add_to_scene(group.as_mut());
                    apply_distance_policy(group.as_mut(), hide_vegetation);
                    self.groups.push(group);
                }
                Err(e) => {
                    warn!(group = %self.name, error = %e, "Instance group not found");
                    return;
                }
            }
        }
    }

    /// Remove and drop every materialized group. The binding stays.
    pub fn detach(&mut self, scene: &mut dyn DecorScene) {
        for mut group in self.groups.drain(..) {
            scene.remove_from_scene(group.as_mut());
        }
    }

    /// Cluster rectangles of every materialized group that has clusters.
    pub fn cluster_bounds(&mut self) -> Vec<WorldBounds> {
        self.groups
            .iter_mut()
            .filter_map(|group| group.clusters().map(|c| c.cluster_bounds()))
            .flatten()
            .collect()
    }

    /// Re-apply the distance policy to every materialized group.
    pub fn apply_policy(&mut self, hide_vegetation: bool) {
        for group in &mut self.groups {
            apply_distance_policy(group.as_mut(), hide_vegetation);
        }
    }
}

impl std::fmt::Debug for DecorAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecorAttachment")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("groups", &self.groups.len())
            .finish()
    }
}

/// Draw distances for an instance name.
///
/// Returns `(instance, coarse_mesh)`.
pub fn distances_for(instance_name: &str, hide_vegetation: bool) -> (DrawDistance, DrawDistance) {
    let is_vegetation = instance_name.to_lowercase().contains(VEGETATION_MARKER);
    if is_vegetation && hide_vegetation {
        (DrawDistance::Culled, DrawDistance::Culled)
    } else {
        (
            DrawDistance::Unlimited,
            DrawDistance::Limited(COARSE_MESH_DISTANCE),
        )
    }
}

/// Make every instance of a group visible regardless of camera distance,
/// except vegetation when it is hidden.
pub fn apply_distance_policy(group: &mut dyn InstanceGroup, hide_vegetation: bool) {
    if let Some(clusters) = group.clusters() {
        clusters.force_visible_from_parent();
    }
    for index in 0..group.instance_count() {
        let (instance, coarse_mesh) = distances_for(&group.instance_name(index), hide_vegetation);
        group.set_distances(index, instance, coarse_mesh);
    }
}

/// Positions of the outpost anchors in a zone group.
pub fn outpost_anchors(zone_group: &dyn InstanceGroup) -> Vec<WorldPoint> {
    (0..zone_group.instance_count())
        .filter(|&i| {
            zone_group
                .instance_name(i)
                .to_lowercase()
                .starts_with(OUTPOST_ANCHOR_PREFIX)
        })
        .map(|i| zone_group.instance_position(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::headless::{GroupTemplate, HeadlessDecor, HeadlessWorld};

    #[test]
    fn test_distances_for() {
        assert_eq!(
            distances_for("fy_tree.plant", true),
            (DrawDistance::Culled, DrawDistance::Culled)
        );
        assert_eq!(
            distances_for("FY_TREE.PLANT", false),
            (DrawDistance::Unlimited, DrawDistance::Limited(100000.0))
        );
        assert_eq!(
            distances_for("hut.shape", true),
            (DrawDistance::Unlimited, DrawDistance::Limited(100000.0))
        );
    }

    #[test]
    fn test_materialize_at_anchors_and_detach() {
        let world = HeadlessWorld::shared();
        let mut scene = HeadlessDecor::new(world.clone()).with_group(
            RUINS_GROUP,
            GroupTemplate::new().instance("ruin.shape", 1.0, 0.0),
        );
        let tile: ZoneTileKey = "3_AC".parse().unwrap();
        let mut attachment = DecorAttachment::new(RUINS_GROUP, "", AttachmentScope::Tile(tile));

        let anchors = [WorldPoint::flat(350.0, -350.0), WorldPoint::flat(450.0, -450.0)];
        attachment.materialize_at(&mut scene, &anchors, false);
        assert_eq!(attachment.group_count(), 2);

        let mut markers: Vec<WorldPoint> = world.borrow().visible_markers().copied().collect();
        markers.sort_by(|a, b| a.x.total_cmp(&b.x));
        assert_eq!(
            markers,
            vec![WorldPoint::flat(351.0, -350.0), WorldPoint::flat(451.0, -450.0)]
        );

        attachment.detach(&mut scene);
        assert!(!attachment.is_materialized());
        assert_eq!(world.borrow().attached_group_count(), 0);
    }

    #[test]
    fn test_missing_group_is_skipped() {
        let mut scene = HeadlessDecor::new(HeadlessWorld::shared());
        let mut attachment = DecorAttachment::new("nowhere.ig", "", AttachmentScope::Continent);
        attachment.materialize(&mut scene, false);
        assert!(!attachment.is_materialized());
    }

    #[test]
    fn test_outpost_anchors() {
        let world = HeadlessWorld::shared();
        let mut scene = HeadlessDecor::new(world).with_group(
            "zone",
            GroupTemplate::new()
                .instance("BAT_ZC_01", 1.0, -1.0)
                .instance("flag_zc", 2.0, -2.0)
                .instance("bat_zc_02", 3.0, -3.0),
        );
        let group = scene.instantiate("zone").unwrap();
        assert_eq!(
            outpost_anchors(group.as_ref()),
            vec![WorldPoint::flat(1.0, -1.0), WorldPoint::flat(3.0, -3.0)]
        );
    }
}
