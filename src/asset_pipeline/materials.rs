use glam::Vec4;

use crate::material::Material;

pub fn load_materials_from_gltf(
    document: &gltf::Document,
    images: &[gltf::image::Data],
) -> Vec<Material> {
    document
        .materials()
        .map(|material| {
            let name = material.name().unwrap_or("Unnamed material").to_string();
            let pbr = material.pbr_metallic_roughness();

            let base_color_texture = pbr.base_color_texture().and_then(|info| {
                let image_index = info.texture().source().index();

                match images.get(image_index) {
                    Some(image) => convert_image_data_to_rgba(image),
                    None => {
                        log::warn!("Material {name}: image {image_index} out of bounds");
                        None
                    }
                }
            });

            Material {
                name,
                base_color_factor: Vec4::from_array(pbr.base_color_factor()),
                base_color_texture,
            }
        })
        .collect()
}

fn convert_image_data_to_rgba(data: &gltf::image::Data) -> Option<gltf::image::Data> {
    use gltf::image::Format;

    let pixels = match data.format {
        Format::R8G8B8A8 => data.pixels.clone(),
        Format::R8G8B8 => {
            let mut rgba = Vec::with_capacity(data.pixels.len() / 3 * 4);

            for pixel in data.pixels.chunks_exact(3) {
                rgba.extend_from_slice(pixel);
                rgba.push(255);
            }

            rgba
        }
        Format::R8 => data.pixels.iter().flat_map(|&l| [l, l, l, 255]).collect(),
        Format::R8G8 => data
            .pixels
            .chunks_exact(2)
            .flat_map(|la| [la[0], la[0], la[0], la[1]])
            .collect(),
        other => {
            log::warn!("Unsupported image format {other:?}, using base color factor only");
            return None;
        }
    };

    Some(gltf::image::Data {
        pixels,
        format: Format::R8G8B8A8,
        width: data.width,
        height: data.height,
    })
}
