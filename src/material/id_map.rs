//! Material name to material ID assignment.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use crate::util::{Error, Result};

/// Maps material names to `u16` material IDs.
///
/// New names get the lowest unused ID at or after an allocation hint that
/// only moves forward. Once locked, unknown names map to the undefined
/// material ID instead of allocating.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterialIdMap {
    map: HashMap<String, u16>,
    used: BTreeSet<u16>,
    next_hint: u16,
    locked: bool,
    undefined: Option<u16>,
}

impl MaterialIdMap {
    /// Create an empty, unlocked map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all assignments and unlock.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Stop allocating IDs for unknown names.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Number of named materials.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Check if `name` has an ID.
    pub fn has_material(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Check if the undefined material has an ID.
    pub fn has_undefined_material(&self) -> bool {
        self.undefined.is_some()
    }

    /// ID of `name`, allocating one unless the map is locked.
    pub fn material_id(&mut self, name: &str) -> Result<u16> {
        if let Some(&id) = self.map.get(name) {
            return Ok(id);
        }
        if self.locked {
            return self.undefined_material_id();
        }
        let id = self.next_unused_id()?;
        self.insert_material(id, name);
        Ok(id)
    }

    /// ID for faces without a known material, allocated on first use.
    pub fn undefined_material_id(&mut self) -> Result<u16> {
        if let Some(id) = self.undefined {
            return Ok(id);
        }
        let id = self.next_unused_id()?;
        self.insert_undefined_material(id);
        Ok(id)
    }

    /// Assign `id` to `name`. An existing assignment for `name` is kept.
    pub fn insert_material(&mut self, id: u16, name: &str) {
        self.map.entry(name.to_string()).or_insert(id);
        self.used.insert(id);
    }

    /// Assign `id` to the undefined material unless it already has one.
    pub fn insert_undefined_material(&mut self, id: u16) {
        self.undefined.get_or_insert(id);
        self.used.insert(id);
    }

    fn next_unused_id(&mut self) -> Result<u16> {
        while self.used.contains(&self.next_hint) {
            if self.next_hint == u16::MAX {
                return Err(Error::MaterialIdsExhausted);
            }
            self.next_hint += 1;
        }
        Ok(self.next_hint)
    }

    /// Material IDs for per-face material names. Empty names are undefined.
    pub fn face_ids(&mut self, names: &[String]) -> Result<Vec<u16>> {
        names
            .iter()
            .map(|name| {
                if name.is_empty() {
                    self.undefined_material_id()
                } else {
                    self.material_id(name)
                }
            })
            .collect()
    }
}

impl FromStr for MaterialIdMap {
    type Err = Error;

    /// Parse `id=name` entries separated by commas. `id=` with an empty
    /// name assigns the undefined material.
    fn from_str(s: &str) -> Result<Self> {
        let mut map = Self::new();
        let invalid = |msg: String| Error::config(format!("material ID map: {msg}"));

        for entry in s.split(',').map(str::trim) {
            if entry.is_empty() {
                continue;
            }
            let (id, name) = entry
                .split_once('=')
                .ok_or_else(|| invalid(format!("entry \"{entry}\" must contain '='")))?;
            if id.trim().is_empty() {
                return Err(invalid(format!("entry \"{entry}\" must not begin with '='")));
            }
            if name.contains('=') {
                return Err(invalid(format!("entry \"{entry}\" must contain exactly one '='")));
            }
            let id: u16 = id
                .trim()
                .parse()
                .map_err(|e| invalid(format!("bad ID \"{}\": {e}", id.trim())))?;
            let name = name.trim();

            if name.is_empty() {
                if map.has_undefined_material() {
                    return Err(invalid("undefined material given more than once".into()));
                }
                map.insert_undefined_material(id);
            } else {
                if map.has_material(name) {
                    return Err(invalid(format!("material \"{name}\" given more than once")));
                }
                map.insert_material(id, name);
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_is_monotonic() {
        let mut m = MaterialIdMap::new();
        m.insert_material(1, "steel");
        assert_eq!(m.material_id("wood").unwrap(), 0);
        assert_eq!(m.material_id("glass").unwrap(), 2);
        assert_eq!(m.material_id("wood").unwrap(), 0);
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn test_locked_map_uses_undefined() {
        let mut m = MaterialIdMap::new();
        m.insert_material(0, "steel");
        m.lock();
        let undefined = m.material_id("unknown").unwrap();
        assert_eq!(undefined, 1);
        assert!(m.has_undefined_material());
        assert!(!m.has_material("unknown"));
        assert_eq!(m.material_id("other").unwrap(), undefined);
        assert_eq!(m.material_id("steel").unwrap(), 0);
    }

    #[test]
    fn test_undefined_id_is_reserved() {
        let mut m = MaterialIdMap::new();
        let undefined = m.undefined_material_id().unwrap();
        assert_ne!(m.material_id("a").unwrap(), undefined);
    }

    #[test]
    fn test_exhausted() {
        let mut m = MaterialIdMap::new();
        for id in 0..=u16::MAX {
            m.insert_material(id, &format!("m{id}"));
        }
        assert!(matches!(m.material_id("one too many"), Err(Error::MaterialIdsExhausted)));
    }

    #[test]
    fn test_parse() {
        let mut m: MaterialIdMap = "3=red, 7 = blue ,9=".parse().unwrap();
        assert_eq!(m.material_id("red").unwrap(), 3);
        assert_eq!(m.material_id("blue").unwrap(), 7);
        assert_eq!(m.undefined_material_id().unwrap(), 9);
        assert!(!m.is_locked());

        assert!("=red".parse::<MaterialIdMap>().is_err());
        assert!("1=a=b".parse::<MaterialIdMap>().is_err());
        assert!("x=red".parse::<MaterialIdMap>().is_err());
        assert!("70000=red".parse::<MaterialIdMap>().is_err());
        assert!("1=red,2=red".parse::<MaterialIdMap>().is_err());
        assert!("1=,2=".parse::<MaterialIdMap>().is_err());
        assert!("".parse::<MaterialIdMap>().unwrap().is_empty());
    }

    #[test]
    fn test_face_ids() {
        let mut m = MaterialIdMap::new();
        let names = vec!["a".to_string(), String::new(), "a".to_string(), "b".to_string()];
        assert_eq!(m.face_ids(&names).unwrap(), vec![0, 1, 0, 2]);
    }
}
