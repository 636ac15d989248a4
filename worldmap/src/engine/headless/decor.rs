//! Headless décor scene and instance groups.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::world::{DecorMarker, SharedWorld};
use crate::coord::{WorldBounds, WorldPoint, ZoneTileKey};
use crate::engine::{ClusterControl, DecorScene, DrawDistance, GroupHandle, InstanceGroup};
use crate::error::{MapError, MapResult, ResourceKind};
use crate::season::Season;

/// One instance of a group template.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessInstance {
    pub name: String,
    /// Offset from the group position.
    pub offset: WorldPoint,
}

/// Content of a named instance group.
#[derive(Debug, Clone, Default)]
pub struct GroupTemplate {
    pub instances: Vec<HeadlessInstance>,
    pub clusters: usize,
}

impl GroupTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance(mut self, name: impl Into<String>, x: f64, y: f64) -> Self {
        self.instances.push(HeadlessInstance {
            name: name.into(),
            offset: WorldPoint::flat(x, y),
        });
        self
    }

    pub fn with_clusters(mut self, clusters: usize) -> Self {
        self.clusters = clusters;
        self
    }
}

/// Margin around the instances of a cluster.
const CLUSTER_MARGIN: f64 = 2.0;

/// Instance `i` of a group belongs to cluster `i % count`.
struct HeadlessClusters {
    world: SharedWorld,
    handle: GroupHandle,
    count: usize,
    bounds: Vec<WorldBounds>,
}

impl ClusterControl for HeadlessClusters {
    fn cluster_count(&self) -> usize {
        self.count
    }

    fn force_visible_from_parent(&mut self) {
        self.world.borrow_mut().forced_clusters.insert(self.handle);
    }

    fn cluster_bounds(&self) -> Vec<WorldBounds> {
        self.bounds.clone()
    }
}

/// Instance group living in the headless world.
pub struct HeadlessGroup {
    world: SharedWorld,
    handle: GroupHandle,
    name: String,
    instances: Vec<HeadlessInstance>,
    position: WorldPoint,
    distances: Vec<(DrawDistance, DrawDistance)>,
    clusters: Option<HeadlessClusters>,
}

impl HeadlessGroup {
    fn from_template(
        world: SharedWorld,
        handle: GroupHandle,
        name: &str,
        template: &GroupTemplate,
    ) -> Self {
        let clusters = (template.clusters > 0).then(|| HeadlessClusters {
            world: world.clone(),
            handle,
            count: template.clusters,
            bounds: Vec::new(),
        });
        let mut group = Self {
            world,
            handle,
            name: name.to_string(),
            instances: template.instances.clone(),
            position: WorldPoint::default(),
            distances: vec![
                (DrawDistance::Unlimited, DrawDistance::Unlimited);
                template.instances.len()
            ],
            clusters,
        };
        group.update_cluster_bounds();
        group
    }

    /// Recompute cluster rectangles from the placed instances.
    fn update_cluster_bounds(&mut self) {
        let Some(count) = self.clusters.as_ref().map(|c| c.count) else {
            return;
        };
        let mut rects: Vec<Option<WorldBounds>> = vec![None; count];
        for i in 0..self.instances.len() {
            let p = self.instance_position(i);
            let rect = &mut rects[i % count];
            *rect = Some(match rect.take() {
                Some(r) => WorldBounds::from_corners(
                    r.min.x.min(p.x),
                    r.min.y.min(p.y),
                    r.max.x.max(p.x),
                    r.max.y.max(p.y),
                ),
                None => WorldBounds::from_corners(p.x, p.y, p.x, p.y),
            });
        }
        let bounds = rects
            .into_iter()
            .flatten()
            .map(|r| r.padded(CLUSTER_MARGIN))
            .collect();
        if let Some(clusters) = self.clusters.as_mut() {
            clusters.bounds = bounds;
        }
    }

    /// Distances last applied to an instance.
    pub fn distances(&self, index: usize) -> Option<(DrawDistance, DrawDistance)> {
        self.distances.get(index).copied()
    }

    fn markers(&self) -> Vec<DecorMarker> {
        (0..self.instances.len())
            .map(|i| DecorMarker {
                position: self.instance_position(i),
                visible: self.distances[i].0.is_visible(),
            })
            .collect()
    }

    /// Push the current markers to the world if the group is in the scene.
    fn sync(&self) {
        let markers = self.markers();
        if let Some(attached) = self.world.borrow_mut().attached.get_mut(&self.handle) {
            *attached = markers;
        }
    }

    fn attach(&self) {
        let markers = self.markers();
        self.world.borrow_mut().attached.insert(self.handle, markers);
    }

    fn detach(&self) {
        self.world.borrow_mut().attached.remove(&self.handle);
    }
}

impl InstanceGroup for HeadlessGroup {
    fn handle(&self) -> GroupHandle {
        self.handle
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn instance_name(&self, index: usize) -> String {
        self.instances
            .get(index)
            .map(|i| i.name.clone())
            .unwrap_or_default()
    }

    fn instance_position(&self, index: usize) -> WorldPoint {
        let offset = self
            .instances
            .get(index)
            .map(|i| i.offset)
            .unwrap_or_default();
        WorldPoint::new(
            self.position.x + offset.x,
            self.position.y + offset.y,
            self.position.z + offset.z,
        )
    }

    fn set_position(&mut self, position: WorldPoint) {
        self.position = position;
        self.update_cluster_bounds();
        self.sync();
    }

    fn set_distances(&mut self, index: usize, instance: DrawDistance, coarse_mesh: DrawDistance) {
        if let Some(slot) = self.distances.get_mut(index) {
            *slot = (instance, coarse_mesh);
            self.sync();
        }
    }

    fn clusters(&mut self) -> Option<&mut dyn ClusterControl> {
        self.clusters
            .as_mut()
            .map(|c| c as &mut dyn ClusterControl)
    }
}

/// Headless [`DecorScene`] backed by in-memory group templates.
pub struct HeadlessDecor {
    world: SharedWorld,
    next_handle: u64,
    templates: HashMap<String, GroupTemplate>,
    zone_templates: HashMap<ZoneTileKey, GroupTemplate>,
    landscape_files: Option<HashSet<String>>,
    permissive: bool,
    landscape: Option<(String, Season)>,
    zone_groups: BTreeMap<ZoneTileKey, HeadlessGroup>,
}

/// Lookup key for a group name: lowercase, without `.ig`.
fn template_key(name: &str) -> String {
    let lower = name.to_lowercase();
    lower.strip_suffix(".ig").unwrap_or(&lower).to_string()
}

impl HeadlessDecor {
    pub fn new(world: SharedWorld) -> Self {
        Self {
            world,
            next_handle: 1,
            templates: HashMap::new(),
            zone_templates: HashMap::new(),
            landscape_files: None,
            permissive: false,
            landscape: None,
            zone_groups: BTreeMap::new(),
        }
    }

    /// Register a named group.
    pub fn with_group(mut self, name: &str, template: GroupTemplate) -> Self {
        self.templates.insert(template_key(name), template);
        self
    }

    /// Register the zone group of a tile. Offsets are absolute positions.
    pub fn with_zone_group(mut self, tile: ZoneTileKey, template: GroupTemplate) -> Self {
        self.zone_templates.insert(tile, template);
        self
    }

    /// Only accept these landscape group files; any file is accepted otherwise.
    pub fn with_landscape_file(mut self, name: &str) -> Self {
        self.landscape_files
            .get_or_insert_with(HashSet::new)
            .insert(name.to_lowercase());
        self
    }

    /// Instantiate unknown names as empty groups instead of failing.
    pub fn permissive(mut self) -> Self {
        self.permissive = true;
        self
    }

    /// Season the zone groups were initialised for.
    pub fn zone_group_season(&self) -> Option<Season> {
        self.landscape.as_ref().map(|(_, season)| *season)
    }

    fn allocate_handle(&mut self) -> GroupHandle {
        let handle = GroupHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }
}

impl DecorScene for HeadlessDecor {
    fn instantiate(&mut self, name: &str) -> MapResult<Box<dyn InstanceGroup>> {
        let template = match self.templates.get(&template_key(name)) {
            Some(template) => template.clone(),
            None if self.permissive => GroupTemplate::new(),
            None => return Err(MapError::not_found(ResourceKind::Decor, name)),
        };
        let handle = self.allocate_handle();
        Ok(Box::new(HeadlessGroup::from_template(
            self.world.clone(),
            handle,
            name,
            &template,
        )))
    }

    fn add_to_scene(&mut self, group: &mut dyn InstanceGroup) {
        let markers = (0..group.instance_count())
            .map(|i| DecorMarker {
                position: group.instance_position(i),
                visible: true,
            })
            .collect();
        self.world.borrow_mut().attached.insert(group.handle(), markers);
    }

    fn remove_from_scene(&mut self, group: &mut dyn InstanceGroup) {
        self.world.borrow_mut().attached.remove(&group.handle());
    }

    fn init_zone_groups(&mut self, landscape_groups: &str, season: Season) -> MapResult<()> {
        if let Some(files) = &self.landscape_files {
            if !files.contains(&landscape_groups.to_lowercase()) {
                return Err(MapError::not_found(
                    ResourceKind::LandscapeGroups,
                    landscape_groups,
                ));
            }
        }
        self.landscape = Some((landscape_groups.to_string(), season));
        Ok(())
    }

    fn load_zone_groups(&mut self, tiles: &[ZoneTileKey]) {
        if self.landscape.is_none() {
            return;
        }
        for tile in tiles {
            if self.zone_groups.contains_key(tile) {
                continue;
            }
            let Some(template) = self.zone_templates.get(tile).cloned() else {
                continue;
            };
            let handle = self.allocate_handle();
            let group = HeadlessGroup::from_template(
                self.world.clone(),
                handle,
                &format!("{}.ig", tile.name().to_lowercase()),
                &template,
            );
            group.attach();
            debug!(tile = %tile, instances = group.instance_count(), "zone group loaded");
            self.zone_groups.insert(*tile, group);
        }
    }

    fn unload_zone_groups(&mut self, tiles: &[ZoneTileKey]) {
        for tile in tiles {
            if let Some(group) = self.zone_groups.remove(tile) {
                group.detach();
            }
        }
    }

    fn reset_zone_groups(&mut self) {
        for group in self.zone_groups.values() {
            group.detach();
        }
        self.zone_groups.clear();
        self.landscape = None;
    }

    fn zone_group(&mut self, tile: &ZoneTileKey) -> Option<&mut dyn InstanceGroup> {
        self.zone_groups
            .get_mut(tile)
            .map(|g| g as &mut dyn InstanceGroup)
    }

    fn attached_zone_tiles(&self) -> Vec<ZoneTileKey> {
        self.zone_groups.keys().copied().collect()
    }
}
