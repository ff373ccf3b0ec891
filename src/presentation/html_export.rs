// Static HTML export - the rendered map as a standalone page
use crate::application::map_surface::{Marker, PanelCard, PanelSlot, Popup};
use crate::presentation::console_surface::ConsoleSurface;
use crate::presentation::mapping::escape_html;
use std::fmt::Write;

/// Popup body as markup, the way a web map binds it to a marker.
pub fn popup_markup(popup: &Popup) -> String {
    let mut markup = format!("<strong>{}</strong>", escape_html(&popup.title));
    for line in &popup.lines {
        let _ = write!(markup, "<br>{}", escape_html(line));
    }
    markup
}

fn card_markup(card: &PanelCard) -> String {
    let mut markup = format!("<div class=\"card\"><h3>{}</h3>", escape_html(&card.title));
    if let Some(headline) = &card.headline {
        let style = card
            .accent
            .map(|color| format!(" style=\"color: {}\"", escape_html(color)))
            .unwrap_or_default();
        let _ = write!(markup, "<div class=\"value\"{}>{}</div>", style, escape_html(headline));
    }
    for note in &card.notes {
        let _ = write!(markup, "<p>{}</p>", escape_html(note));
    }
    markup.push_str("</div>");
    markup
}

fn marker_row(marker: &Marker) -> String {
    format!(
        "<tr><td>{}</td><td><span class=\"dot\" style=\"background: {}\"></span></td>\
         <td>{:.5}, {:.5}</td><td>{}</td></tr>",
        marker.key.index,
        escape_html(&marker.style.fill_color),
        marker.position.lat,
        marker.position.lng,
        popup_markup(&marker.popup)
    )
}

/// Panel cards followed by one table row per marker.
pub fn render_page(surface: &ConsoleSurface) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Stress Map</title>\
         <style>.card{display:inline-block;margin:4px;padding:8px;border:1px solid #ccc}\
         .dot{display:inline-block;width:10px;height:10px;border-radius:50%}</style>\
         </head><body>\n",
    );

    for slot in PanelSlot::ALL {
        let card = surface.panel_card(slot);
        if !card.title.is_empty() {
            page.push_str(&card_markup(card));
        }
    }
    page.push_str("\n<table>\n");
    for marker in surface.markers() {
        page.push_str(&marker_row(marker));
        page.push('\n');
    }
    page.push_str("</table>\n</body></html>\n");
    page
}
