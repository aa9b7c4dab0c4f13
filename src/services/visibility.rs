// src/services/visibility.rs

use uuid::Uuid;

use crate::models::{Brand, Client, Representative};

// Predicados puros de visibilidade. Admin enxerga tudo; o vendedor só o
// que está atribuído a ele. Os direitos de mutação ESPELHAM os de leitura.

pub fn can_view(actor: &Representative, client: &Client) -> bool {
    actor.is_admin() || client.assigned_to == Some(actor.id)
}

pub fn can_mutate(actor: &Representative, client: &Client) -> bool {
    can_view(actor, client)
}

/// Território: restringe apenas REGISTROS NOVOS de um vendedor; nunca
/// esconde retroativamente um lead que já foi atribuído a ele.
/// Allow-list vazia = sem restrição.
pub fn can_create(actor: &Representative, province: &str, brand: Option<Uuid>) -> bool {
    if actor.is_admin() {
        return true;
    }

    let province_ok = actor.allowed_provinces.is_empty()
        || actor.allowed_provinces.iter().any(|p| p == province);
    let brand_ok = match brand {
        None => true,
        Some(brand) => actor.allowed_brands.is_empty() || actor.allowed_brands.contains(&brand),
    };

    province_ok && brand_ok
}

/// Marcas que o ator pode oferecer nos inputs de seleção.
pub fn selectable_brands(actor: &Representative, brands: Vec<Brand>) -> Vec<Brand> {
    if actor.is_admin() || actor.allowed_brands.is_empty() {
        return brands;
    }
    brands
        .into_iter()
        .filter(|b| actor.allowed_brands.contains(&b.id))
        .collect()
}
