//! Text summaries of production counts, formatted for WhatsApp.

use url::Url;

use crate::export::rows_to_csv;
use crate::inventory::{Inventory, PRODUCT_OPTIONS};
use crate::model::{Franchise, School};

const WHATSAPP_SHARE_BASE: &str = "https://wa.me/";

/// Products in report order: the fixed categories first, then anything else by name.
pub fn report_products(inventory: &Inventory) -> Vec<&str> {
    let mut out: Vec<&str> = PRODUCT_OPTIONS
        .iter()
        .copied()
        .filter(|category| inventory.product_total(category) > 0)
        .collect();
    let mut extra: Vec<&str> = inventory
        .products()
        .filter(|product| {
            !PRODUCT_OPTIONS.contains(product) && inventory.product_total(product) > 0
        })
        .collect();
    extra.sort_unstable();
    out.extend(extra);
    out
}

fn push_blocks(text: &mut String, inventory: &Inventory) {
    let products = report_products(inventory);
    if products.is_empty() {
        text.push_str("Nenhum item adicionado.\n");
        return;
    }
    for (idx, product) in products.into_iter().enumerate() {
        if idx > 0 {
            text.push('\n');
        }
        text.push_str(&format!("*{product}* ({})\n", inventory.product_total(product)));
        for (size, quantity) in inventory.sorted_sizes(product) {
            text.push_str(&format!("- {size}: {quantity}\n"));
        }
    }
}

fn push_footer(text: &mut String, inventory: &Inventory) {
    text.push_str(&format!("\n*Total de peças: {}*\n", inventory.total_items()));
}

pub fn production_report(school_name: &str, franchise: &Franchise) -> String {
    let mut text = format!("*PEDIDO - {} / {}*\n\n", school_name.trim(), franchise.name.trim());
    push_blocks(&mut text, &franchise.inventory);
    push_footer(&mut text, &franchise.inventory);
    text
}

/// Every unit of the school merged into one order.
pub fn school_report(school: &School) -> String {
    let mut merged = Inventory::new();
    for franchise in &school.franchises {
        merged.merge(&franchise.inventory);
    }
    let mut text = format!(
        "*PEDIDO - {}* ({} unidades)\n\n",
        school.name.trim(),
        school.franchises.len()
    );
    push_blocks(&mut text, &merged);
    push_footer(&mut text, &merged);
    text
}

pub const INVENTORY_CSV_COLUMNS: [&str; 4] = ["Unidade", "Produto", "Tamanho", "Quantidade"];

pub fn inventory_csv(school: &School) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();
    for franchise in &school.franchises {
        for product in report_products(&franchise.inventory) {
            for (size, quantity) in franchise.inventory.sorted_sizes(product) {
                rows.push(vec![
                    franchise.name.clone(),
                    product.to_string(),
                    size.to_string(),
                    quantity.to_string(),
                ]);
            }
        }
    }
    rows_to_csv(&INVENTORY_CSV_COLUMNS, rows)
}

pub fn whatsapp_share_url(text: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(WHATSAPP_SHARE_BASE, &[("text", text)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn franchise(name: &str, items: &[(&str, &str, u32)]) -> Franchise {
        let mut inventory = Inventory::new();
        for (product, size, qty) in items {
            inventory.add(product, size, *qty).unwrap();
        }
        Franchise {
            id: name.to_lowercase(),
            name: name.into(),
            inventory,
            ..Default::default()
        }
    }

    #[test]
    fn categories_in_fixed_order_with_extras_last() {
        let unit = franchise(
            "Centro",
            &[
                ("Moletom", "M", 2),
                ("Avental", "U", 1),
                ("Camisetas", "12", 3),
                ("Camisetas", "GG", 1),
                ("Camisetas", "8", 5),
            ],
        );
        assert_eq!(
            production_report("Colégio Santa Maria", &unit),
            "*PEDIDO - Colégio Santa Maria / Centro*\n\n\
             *Camisetas* (9)\n\
             - 8: 5\n\
             - 12: 3\n\
             - GG: 1\n\
             \n*Moletom* (2)\n\
             - M: 2\n\
             \n*Avental* (1)\n\
             - U: 1\n\
             \n*Total de peças: 12*\n"
        );
    }

    #[test]
    fn empty_inventory_report() {
        let unit = franchise("Norte", &[]);
        assert_eq!(
            production_report("Escola", &unit),
            "*PEDIDO - Escola / Norte*\n\nNenhum item adicionado.\n\n*Total de peças: 0*\n"
        );
    }

    #[test]
    fn school_report_merges_units() {
        let school = School {
            id: "s".into(),
            name: "Escola".into(),
            franchises: vec![
                franchise("A", &[("Calça", "40", 2)]),
                franchise("B", &[("Calça", "40", 1), ("Bermudas", "10", 4)]),
            ],
            ..Default::default()
        };
        let text = school_report(&school);
        assert!(text.starts_with("*PEDIDO - Escola* (2 unidades)\n\n*Bermudas* (4)\n"));
        assert!(text.contains("*Calça* (3)\n- 40: 3\n"));
        assert!(text.ends_with("*Total de peças: 7*\n"));
    }

    #[test]
    fn csv_lists_every_entry() {
        let school = School {
            franchises: vec![franchise("Centro, Bloco 2", &[("Shorts Saia", "10", 2)])],
            ..Default::default()
        };
        assert_eq!(
            inventory_csv(&school),
            "Unidade,Produto,Tamanho,Quantidade\n\"Centro, Bloco 2\",Shorts Saia,10,2"
        );
    }

    #[test]
    fn share_url_encodes_text() {
        let url = whatsapp_share_url("*TOTAL: R$ 44,30*\n").unwrap();
        assert!(url.as_str().starts_with("https://wa.me/?text="));
        let (_, text) = url.query_pairs().next().unwrap();
        assert_eq!(text, "*TOTAL: R$ 44,30*\n");
    }
}
