// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bit-packed draw sort keys.
//!
//! Both draw classes share one layout, from the least significant bit:
//!
//! | bits    | field                                  |
//! |---------|----------------------------------------|
//! | 0..4    | LOD index                              |
//! | 4..34   | mesh id                                |
//! | 34..63  | material id                            |
//! | 63      | tessellated / alpha-tested surface     |
//!
//! Sorting keys in descending order groups draws by pipeline flag, then
//! material, then mesh, then LOD.
//!
//! The shadow class leaves the material field zero unless the flag is set:
//! opaque depth-only casters with different materials share a key prefix and
//! batch together, at the cost of no material ordering inside that group.

use super::{MaterialId, MeshId};

const LOD_BITS: u32 = 4;
const MESH_BITS: u32 = 30;
const MATERIAL_BITS: u32 = 29;

const MESH_SHIFT: u32 = LOD_BITS;
const MATERIAL_SHIFT: u32 = MESH_SHIFT + MESH_BITS;
const FLAG_SHIFT: u32 = MATERIAL_SHIFT + MATERIAL_BITS;

const LOD_MASK: u64 = (1 << LOD_BITS) - 1;
const MESH_MASK: u64 = (1 << MESH_BITS) - 1;
const MATERIAL_MASK: u64 = (1 << MATERIAL_BITS) - 1;

/// Which codec a frustum's draws are keyed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawClass {
    /// Forward-lit draws of the main view.
    Lit,
    /// Depth-only draws of a shadow view.
    Shadow,
}

/// The fields recovered from a [`SortKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSortKey {
    /// The material, or `None` for an opaque shadow key that omits it.
    pub material: Option<MaterialId>,
    /// The mesh.
    pub mesh: MeshId,
    /// The LOD index.
    pub lod: u8,
    /// The tessellated / alpha-tested flag.
    pub tessellated: bool,
}

/// A 64-bit draw ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SortKey(pub u64);

impl SortKey {
    /// Number of LOD levels the key can address.
    pub const MAX_LOD_COUNT: u8 = 1 << LOD_BITS;
    /// Largest mesh id that fits the key.
    pub const MAX_MESH_ID: u32 = MESH_MASK as u32;
    /// Largest material id that fits the key.
    pub const MAX_MATERIAL_ID: u32 = MATERIAL_MASK as u32;

    /// Encodes a key for the given draw class.
    #[inline]
    pub fn encode(
        class: DrawClass,
        material: MaterialId,
        mesh: MeshId,
        lod: u8,
        tessellated: bool,
    ) -> Self {
        match class {
            DrawClass::Lit => Self::encode_lit(material, mesh, lod, tessellated),
            DrawClass::Shadow => Self::encode_shadow(material, mesh, lod, tessellated),
        }
    }

    /// Decodes a key produced by [`SortKey::encode`] with the same class.
    #[inline]
    pub fn decode(self, class: DrawClass) -> DecodedSortKey {
        match class {
            DrawClass::Lit => self.decode_lit(),
            DrawClass::Shadow => self.decode_shadow(),
        }
    }

    /// Encodes a lit/forward key. The material id is always present.
    #[inline]
    pub fn encode_lit(material: MaterialId, mesh: MeshId, lod: u8, tessellated: bool) -> Self {
        debug_assert!(material.is_valid(), "invalid material id reached the sort-key codec");
        debug_assert!(material.0 <= Self::MAX_MATERIAL_ID, "material id {} exceeds key width", material.0);
        Self(pack_common(mesh, lod, tessellated) | material_bits(material))
    }

    /// Decodes a lit/forward key.
    #[inline]
    pub fn decode_lit(self) -> DecodedSortKey {
        DecodedSortKey {
            material: Some(MaterialId(((self.0 >> MATERIAL_SHIFT) & MATERIAL_MASK) as u32)),
            ..self.unpack_common()
        }
    }

    /// Encodes a shadow/depth-only key.
    ///
    /// The material id only enters the key when `tessellated` is set.
    #[inline]
    pub fn encode_shadow(material: MaterialId, mesh: MeshId, lod: u8, tessellated: bool) -> Self {
        debug_assert!(material.is_valid(), "invalid material id reached the sort-key codec");
        let mut key = pack_common(mesh, lod, tessellated);
        if tessellated {
            debug_assert!(material.0 <= Self::MAX_MATERIAL_ID, "material id {} exceeds key width", material.0);
            key |= material_bits(material);
        }
        Self(key)
    }

    /// Decodes a shadow/depth-only key.
    #[inline]
    pub fn decode_shadow(self) -> DecodedSortKey {
        let common = self.unpack_common();
        DecodedSortKey {
            material: common
                .tessellated
                .then(|| MaterialId(((self.0 >> MATERIAL_SHIFT) & MATERIAL_MASK) as u32)),
            ..common
        }
    }

    fn unpack_common(self) -> DecodedSortKey {
        DecodedSortKey {
            material: None,
            mesh: MeshId(((self.0 >> MESH_SHIFT) & MESH_MASK) as u32),
            lod: (self.0 & LOD_MASK) as u8,
            tessellated: (self.0 >> FLAG_SHIFT) & 1 == 1,
        }
    }
}

#[inline]
fn pack_common(mesh: MeshId, lod: u8, tessellated: bool) -> u64 {
    debug_assert!(mesh.is_valid(), "invalid mesh id reached the sort-key codec");
    debug_assert!(mesh.0 <= SortKey::MAX_MESH_ID, "mesh id {} exceeds key width", mesh.0);
    debug_assert!(lod < SortKey::MAX_LOD_COUNT, "lod {lod} exceeds key width");

    (u64::from(tessellated) << FLAG_SHIFT)
        | ((u64::from(mesh.0) & MESH_MASK) << MESH_SHIFT)
        | (u64::from(lod) & LOD_MASK)
}

#[inline]
fn material_bits(material: MaterialId) -> u64 {
    (u64::from(material.0) & MATERIAL_MASK) << MATERIAL_SHIFT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lit_round_trip() {
        let cases = [
            (0, 0, 0, false),
            (7, 123, 3, true),
            (SortKey::MAX_MATERIAL_ID, SortKey::MAX_MESH_ID, 15, false),
            (SortKey::MAX_MATERIAL_ID, SortKey::MAX_MESH_ID, 15, true),
            (1 << 20, 1 << 29, 8, false),
        ];
        for (material, mesh, lod, tess) in cases {
            let key = SortKey::encode_lit(MaterialId(material), MeshId(mesh), lod, tess);
            let decoded = key.decode_lit();
            assert_eq!(decoded.material, Some(MaterialId(material)));
            assert_eq!(decoded.mesh, MeshId(mesh));
            assert_eq!(decoded.lod, lod);
            assert_eq!(decoded.tessellated, tess);
        }
    }

    #[test]
    fn test_shadow_round_trip_with_flag() {
        let key = SortKey::encode_shadow(MaterialId(42), MeshId(9001), 5, true);
        let decoded = key.decode_shadow();
        assert_eq!(decoded.material, Some(MaterialId(42)));
        assert_eq!(decoded.mesh, MeshId(9001));
        assert_eq!(decoded.lod, 5);
        assert!(decoded.tessellated);
    }

    #[test]
    fn test_shadow_without_flag_drops_material() {
        let a = SortKey::encode_shadow(MaterialId(1), MeshId(77), 2, false);
        let b = SortKey::encode_shadow(MaterialId(2), MeshId(77), 2, false);
        assert_eq!(a, b);
        let decoded = a.decode_shadow();
        assert_eq!(decoded.material, None);
        assert_eq!(decoded.mesh, MeshId(77));
        assert_eq!(decoded.lod, 2);

        let c = SortKey::encode_shadow(MaterialId(1), MeshId(77), 2, true);
        let d = SortKey::encode_shadow(MaterialId(2), MeshId(77), 2, true);
        assert_ne!(c, d);
    }

    #[test]
    fn test_descending_order_groups_material_then_mesh_then_lod() {
        let mut keys = vec![
            SortKey::encode_lit(MaterialId(1), MeshId(5), 0, false),
            SortKey::encode_lit(MaterialId(2), MeshId(1), 3, false),
            SortKey::encode_lit(MaterialId(1), MeshId(5), 2, false),
            SortKey::encode_lit(MaterialId(2), MeshId(4), 0, false),
            SortKey::encode_lit(MaterialId(1), MeshId(6), 0, false),
        ];
        keys.sort_unstable_by(|a, b| b.cmp(a));
        let decoded: Vec<_> = keys
            .iter()
            .map(|k| {
                let d = k.decode_lit();
                (d.material.unwrap().0, d.mesh.0, d.lod)
            })
            .collect();
        assert_eq!(
            decoded,
            vec![(2, 4, 0), (2, 1, 3), (1, 6, 0), (1, 5, 2), (1, 5, 0)]
        );
    }

    #[test]
    fn test_class_dispatch() {
        let lit = SortKey::encode(DrawClass::Lit, MaterialId(3), MeshId(4), 1, false);
        assert_eq!(lit, SortKey::encode_lit(MaterialId(3), MeshId(4), 1, false));
        assert_eq!(lit.decode(DrawClass::Lit).material, Some(MaterialId(3)));

        let shadow = SortKey::encode(DrawClass::Shadow, MaterialId(3), MeshId(4), 1, false);
        assert_eq!(shadow.decode(DrawClass::Shadow).material, None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invalid mesh id")]
    fn test_invalid_mesh_asserts() {
        let _ = SortKey::encode_lit(MaterialId(0), MeshId::INVALID, 0, false);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invalid material id")]
    fn test_invalid_material_asserts() {
        let _ = SortKey::encode_shadow(MaterialId::INVALID, MeshId(0), 0, false);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "exceeds key width")]
    fn test_lod_out_of_range_asserts() {
        let _ = SortKey::encode_lit(MaterialId(0), MeshId(0), 16, false);
    }
}
