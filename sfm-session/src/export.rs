//! PLY export of a reconstruction: the point cloud plus a frustum per camera.

use ply_rs::{
    ply::{
        Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
        ScalarType,
    },
    writer::Writer,
};
use sfm_core::{camera_frustum, ReconstructionResult};
use std::io::{self, Write};

/// Write `result` as an ascii PLY file. Each camera contributes its frustum
/// vertices in `camera_color`; with `camera_faces` set, the frustum sides are
/// emitted as triangles so mesh viewers render solid pyramids.
pub fn export_ply(
    mut writer: impl Write,
    result: &ReconstructionResult,
    camera_size: f64,
    camera_color: [u8; 3],
    camera_faces: bool,
) -> io::Result<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;
    ply.header
        .comments
        .push("Exported from sfm-session".to_string());

    // The vertex element carries both reconstruction points and frustum
    // corners.
    let mut point_element = ElementDef::new("vertex".to_string());
    let p = PropertyDef::new("x".to_string(), PropertyType::Scalar(ScalarType::Double));
    point_element.properties.add(p);
    let p = PropertyDef::new("y".to_string(), PropertyType::Scalar(ScalarType::Double));
    point_element.properties.add(p);
    let p = PropertyDef::new("z".to_string(), PropertyType::Scalar(ScalarType::Double));
    point_element.properties.add(p);
    let p = PropertyDef::new("red".to_string(), PropertyType::Scalar(ScalarType::UChar));
    point_element.properties.add(p);
    let p = PropertyDef::new("green".to_string(), PropertyType::Scalar(ScalarType::UChar));
    point_element.properties.add(p);
    let p = PropertyDef::new("blue".to_string(), PropertyType::Scalar(ScalarType::UChar));
    point_element.properties.add(p);
    ply.header.elements.add(point_element);

    if camera_faces {
        let mut face_element = ElementDef::new("face".to_string());
        let vertex_list = PropertyDef::new(
            "vertex_index".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::Int),
        );
        face_element.properties.add(vertex_list);
        ply.header.elements.add(face_element);
    }

    let mut faces: Vec<DefaultElement> = vec![];
    let mut vertices: Vec<DefaultElement> = vec![];

    let mut add_vertex = |p: sfm_core::nalgebra::Point3<f64>, [r, g, b]: [u8; 3]| -> usize {
        let pos = vertices.len();
        let mut point = DefaultElement::new();
        point.insert("x".to_string(), Property::Double(p.x));
        point.insert("y".to_string(), Property::Double(p.y));
        point.insert("z".to_string(), Property::Double(p.z));
        point.insert("red".to_string(), Property::UChar(r));
        point.insert("green".to_string(), Property::UChar(g));
        point.insert("blue".to_string(), Property::UChar(b));
        vertices.push(point);
        pos
    };

    let mut add_triangle = |a: usize, b: usize, c: usize| {
        let mut face = DefaultElement::new();
        face.insert(
            "vertex_index".to_string(),
            Property::ListInt(vec![a as i32, b as i32, c as i32]),
        );
        faces.push(face);
    };

    for (_, pose) in result.cameras.iter() {
        let frustum = camera_frustum(&pose.intrinsics, pose.extrinsics, camera_size);
        let indices = frustum.vertices.map(|v| add_vertex(v, camera_color));
        if camera_faces {
            // The rim winds corner 1..=4; fan triangles out of the apex.
            add_triangle(indices[0], indices[1], indices[2]);
            add_triangle(indices[0], indices[2], indices[3]);
            add_triangle(indices[0], indices[3], indices[4]);
            add_triangle(indices[0], indices[4], indices[1]);
        }
    }

    for point in result.point_cloud.iter() {
        add_vertex(point.position, point.color);
    }

    ply.payload.insert("vertex".to_string(), vertices);
    if camera_faces {
        ply.payload.insert("face".to_string(), faces);
    }

    let w = Writer::new();
    w.write_ply(&mut writer, &mut ply)?;
    Ok(())
}
